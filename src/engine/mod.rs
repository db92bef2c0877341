// ==========================================
// 集装箱堆场计划系统 - 引擎层
// ==========================================
// 职责: 堆场位置模型与多队列计划引擎
// 红线: 引擎层同步、无 I/O；解码/聚合/网格永不向外失败
// ==========================================

pub mod aggregator;
pub mod identity;
pub mod planning;
pub mod position;
pub mod reconciler;
pub mod yard_grid;

// 重导出核心引擎
pub use aggregator::Aggregator;
pub use identity::normalize_code;
pub use planning::{
    BayProductivity, ItemLocation, PlanExportRow, PlanningBoard, ProductivitySummary, ShiftTime,
};
pub use position::decode;
pub use reconciler::{
    AcceptAll, FacilityCodeFilter, ReconcileOutcome, Reconciler, StockEligibility,
};
pub use yard_grid::{BayBlock, BayRows, GridCell, QuadraBlock, QuadraRows, YardGridBuilder};
