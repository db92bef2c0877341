// ==========================================
// 集装箱堆场计划系统 - 统计结果模型
// ==========================================
// 红线: 聚合结果为临时视图，按需重算，不持久化，不回写源实体
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// 无计划时间时的日期区间标签
pub const NO_DATES_LABEL: &str = "no dates";

const DATE_LABEL_FORMAT: &str = "%d/%m/%Y";

// ==========================================
// DateSpan - 计划时间区间（最早/最晚）
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSpan {
    pub first: Option<NaiveDateTime>,
    pub last: Option<NaiveDateTime>,
}

impl DateSpan {
    /// 纳入一个时间点（None 忽略）
    pub fn observe(&mut self, ts: Option<NaiveDateTime>) {
        let Some(ts) = ts else {
            return;
        };
        self.first = Some(self.first.map_or(ts, |f| f.min(ts)));
        self.last = Some(self.last.map_or(ts, |l| l.max(ts)));
    }

    /// 显示标签: 单日 / 区间 / 无日期
    pub fn label(&self) -> String {
        match (self.first, self.last) {
            (Some(first), Some(last)) if first.date() == last.date() => {
                first.format(DATE_LABEL_FORMAT).to_string()
            }
            (Some(first), Some(last)) => format!(
                "{} - {}",
                first.format(DATE_LABEL_FORMAT),
                last.format(DATE_LABEL_FORMAT)
            ),
            _ => NO_DATES_LABEL.to_string(),
        }
    }
}

/// 按服务统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStat {
    pub service: String,
    pub count: usize,
    pub removals: u64,
    pub span: DateSpan,
    pub late: usize,    // 计划时间早于评估时刻
    pub on_time: usize, // 计划时间不早于评估时刻，或无计划时间
}

/// 按区位前缀统计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraStat {
    pub quadra: String,
    pub count: usize,
    pub removals: u64,
    pub span: DateSpan,
}

/// 执行进度（已完成 vs 待执行）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub done_count: usize,
    pub done_removals: u64,
    pub pending_count: usize,
    pub pending_removals: u64,
}

impl ExecutionStats {
    /// 完成比例（0.0 - 1.0），无数据时为 0
    pub fn done_ratio(&self) -> f64 {
        let total = self.done_count + self.pending_count;
        if total == 0 {
            return 0.0;
        }
        self.done_count as f64 / total as f64
    }
}

// ==========================================
// YardReport - 单日（或全部）报表汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YardReport {
    pub date: Option<NaiveDate>, // 过滤日期（None = 全部）
    pub evaluated_at: NaiveDateTime,
    pub total_items: usize,
    pub total_removals: u64,
    pub services: Vec<ServiceStat>,
    pub quadras: Vec<QuadraStat>,
    pub execution: ExecutionStats,
}
