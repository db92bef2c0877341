// ==========================================
// 集装箱堆场计划系统 - 配置层
// ==========================================
// 职责: 系统配置管理（导入过滤、机组集合、默认作业参数）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, get_default_db_path, ConfigManager, DB_PATH_ENV};
