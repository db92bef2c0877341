// ==========================================
// 集装箱堆场计划系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 机组参数与完成标记的持久化
// 约束: 所有查询使用参数化
// ==========================================

pub mod completion_repo;
pub mod error;
pub mod stacker_config_repo;

// 重导出核心仓储
pub use completion_repo::CompletionRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use stacker_config_repo::{StackerConfigRepository, StackerConfigStore};
