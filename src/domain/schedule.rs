// ==========================================
// 集装箱堆场计划系统 - 作业计划领域模型
// ==========================================
// 用途: 计划导入层写入，引擎层只读
// 生命周期: 导入后不可变
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 计划时间显示格式
pub const SCHEDULE_DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

/// 完成标记键中的时间格式
const COMPLETION_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// ==========================================
// ScheduleItem - 预期作业（一行计划）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    // ===== 主键 =====
    pub id: String, // 行唯一标识

    // ===== 基础信息 =====
    pub importer: String,       // 进口商
    pub container_code: String, // 规范化箱号
    pub document_type: String,  // 单证类型
    pub quadra_label: String,   // 完整区位标签（自由文本）
    pub service: String,        // 服务名称
    pub removals: u32,          // 翻箱/移动次数

    // ===== 时间信息 =====
    pub scheduled_at: Option<NaiveDateTime>, // 计划时间（本地时间）
    pub scheduled_display: String,           // 显示字符串（由 scheduled_at 派生）
}

impl ScheduleItem {
    /// 构造计划项，显示字符串由计划时间派生
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        importer: impl Into<String>,
        container_code: impl Into<String>,
        document_type: impl Into<String>,
        quadra_label: impl Into<String>,
        service: impl Into<String>,
        removals: u32,
        scheduled_at: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            id: id.into(),
            importer: importer.into(),
            container_code: container_code.into(),
            document_type: document_type.into(),
            quadra_label: quadra_label.into(),
            service: service.into(),
            removals,
            scheduled_display: display_timestamp(scheduled_at),
            scheduled_at,
        }
    }

    /// 区位前缀（前 2 个字符，不足 2 个字符时原样返回）
    pub fn quadra_prefix(&self) -> String {
        self.quadra_label.chars().take(2).collect()
    }

    /// 完成标记键: 箱号 + 计划时间
    ///
    /// 与行号无关，重新导入同一计划（或行序变化）后仍能对应到同一作业
    pub fn completion_key(&self) -> String {
        let at = self
            .scheduled_at
            .map(|t| t.format(COMPLETION_KEY_FORMAT).to_string())
            .unwrap_or_default();
        format!("{}@{}", self.container_code, at)
    }
}

/// 计划时间 → 显示字符串（无时间时为空串）
pub fn display_timestamp(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format(SCHEDULE_DISPLAY_FORMAT).to_string())
        .unwrap_or_default()
}

// ==========================================
// RawScheduleRecord - 计划导入中间结构体
// ==========================================
// 用途: 导入管道中间产物（文件解析 → 字段映射 → 此结构）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScheduleRecord {
    pub container_code: Option<String>,
    pub importer: Option<String>,
    pub document_type: Option<String>,
    pub quadra_label: Option<String>,
    pub service: Option<String>,
    pub removals: Option<u32>,
    pub scheduled_at: Option<NaiveDateTime>,

    // 元信息
    pub row_number: usize,   // 原始文件行号
    pub has_warning: bool,   // 字段解析回退（不阻断）
}
