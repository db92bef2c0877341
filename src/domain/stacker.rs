// ==========================================
// 集装箱堆场计划系统 - 堆垛机配置模型
// ==========================================
// 用途: 每台机组一份配置（班次开始时间 + 每小时作业量）
// 红线: rate >= 1，避免 ETA 计算除零
// ==========================================

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// 机组标识
pub type MachineId = String;

/// 最低作业效率（移动/小时）
pub const MIN_RATE: u32 = 1;

/// 默认机组集合
pub const DEFAULT_MACHINE_IDS: [&str; 4] = ["1", "2", "3", "4"];

/// 时间格式（HH:MM）
pub const TIME_OF_DAY_FORMAT: &str = "%H:%M";

// ==========================================
// StackerConfig - 机组配置
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackerConfig {
    pub start: NaiveTime, // 班次开始时间
    pub rate: u32,        // 每小时移动次数
}

impl StackerConfig {
    /// 构造配置；非正 rate 被替换为最低值
    pub fn new(start: NaiveTime, rate: i64) -> Self {
        Self {
            start,
            rate: sanitize_rate(rate),
        }
    }

    /// 每次移动所需分钟数
    pub fn minutes_per_move(&self) -> f64 {
        60.0 / f64::from(self.rate.max(MIN_RATE))
    }

    /// 班次开始时间（HH:MM）
    pub fn start_label(&self) -> String {
        self.start.format(TIME_OF_DAY_FORMAT).to_string()
    }
}

impl Default for StackerConfig {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
            rate: 20,
        }
    }
}

/// 钳制作业效率到合法范围
pub fn sanitize_rate(rate: i64) -> u32 {
    rate.clamp(i64::from(MIN_RATE), i64::from(u32::MAX)) as u32
}

/// 解析 HH:MM（兼容 HH:MM:SS）
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_OF_DAY_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_floor() {
        let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        assert_eq!(StackerConfig::new(start, 0).rate, 1);
        assert_eq!(StackerConfig::new(start, -5).rate, 1);
        assert_eq!(StackerConfig::new(start, 15).rate, 15);
    }

    #[test]
    fn test_minutes_per_move() {
        let config = StackerConfig::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 15);
        assert!((config.minutes_per_move() - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("08:30"), NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(parse_time_of_day(" 08:30:15 "), NaiveTime::from_hms_opt(8, 30, 15));
        assert_eq!(parse_time_of_day("8h30"), None);
    }
}
