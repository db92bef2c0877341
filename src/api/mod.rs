// ==========================================
// 集装箱堆场计划系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供 CLI 或上层界面调用
// ==========================================

pub mod error;
pub mod yard_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use yard_api::{
    BayRowsView, BayView, CellView, QuadraRowsView, QuadraView, StockLoadResponse, YardApi,
    YardSummary,
};
