// ==========================================
// 集装箱堆场计划系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、统计结果
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod schedule;
pub mod stacker;
pub mod stats;
pub mod stock;
pub mod types;

// 重导出核心类型
pub use schedule::{RawScheduleRecord, ScheduleItem};
pub use stacker::{MachineId, StackerConfig, DEFAULT_MACHINE_IDS};
pub use stats::{DateSpan, ExecutionStats, QuadraStat, ServiceStat, YardReport};
pub use stock::{RawStockRecord, StockItem, UNSCHEDULED_QUADRA, UNSCHEDULED_SERVICE};
pub use types::{ImportBatch, ImportKind, YardCoordinate};
