// ==========================================
// 集装箱堆场计划系统 - 领域类型定义
// ==========================================
// 职责: 坐标值对象、导入批次元信息
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 堆场坐标 (Yard Coordinate)
// ==========================================
// 纯派生值，不是实体: 由位置字符串计算得到
// 红线: row ∈ [0,5], tier ∈ [1,6]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YardCoordinate {
    pub row: u8,  // 排（lastro），0 = A
    pub tier: u8, // 层，1 = 地面
}

impl YardCoordinate {
    /// 排数（A..F）
    pub const ROWS: u8 = 6;
    /// 最高层
    pub const MAX_TIER: u8 = 6;

    /// 默认坐标（解析失败时的回退值）
    pub const DEFAULT: YardCoordinate = YardCoordinate { row: 0, tier: 1 };

    /// 构造并钳制到合法范围
    pub fn clamped(row: i64, tier: i64) -> Self {
        Self {
            row: row.clamp(0, i64::from(Self::ROWS) - 1) as u8,
            tier: tier.clamp(1, i64::from(Self::MAX_TIER)) as u8,
        }
    }

    /// 排字母（A..F）
    pub fn row_letter(&self) -> char {
        char::from(b'A' + self.row)
    }
}

impl Default for YardCoordinate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for YardCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row_letter(), self.tier)
    }
}

// ==========================================
// 导入类型 (Import Kind)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportKind {
    Schedule, // 作业计划（agendamento）
    Stock,    // 堆存快照
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportKind::Schedule => write!(f, "SCHEDULE"),
            ImportKind::Stock => write!(f, "STOCK"),
        }
    }
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 用途: 记录一次文件导入的统计信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub kind: ImportKind,                   // 导入类型
    pub file_name: Option<String>,          // 源文件名
    pub total_rows: usize,                  // 总行数
    pub accepted_rows: usize,               // 接收行数
    pub discarded_rows: usize,              // 丢弃行数（缺主键/不符合资格）
    pub warning_rows: usize,                // 警告行数（字段回退为默认值）
    pub imported_at: DateTime<Utc>,         // 导入时间
    pub elapsed_ms: u64,                    // 导入耗时（毫秒）
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_coordinate() {
        assert_eq!(YardCoordinate::clamped(25, 9), YardCoordinate { row: 5, tier: 6 });
        assert_eq!(YardCoordinate::clamped(-1, 0), YardCoordinate { row: 0, tier: 1 });
    }

    #[test]
    fn test_coordinate_display() {
        assert_eq!(YardCoordinate { row: 1, tier: 5 }.to_string(), "B5");
    }
}
