// ==========================================
// 集装箱堆场计划系统 - 导入层
// ==========================================
// 职责: 外部文件导入（作业计划 / 堆存快照）与作业计划导出
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod plan_writer;
pub mod yard_importer_impl;
pub mod yard_importer_trait;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{CsvParser, ExcelParser, RawRow, UniversalFileParser};
pub use plan_writer::{plan_csv_string, write_plan_csv};
pub use yard_importer_impl::YardImporterImpl;

// 重导出 Trait 接口
pub use yard_importer_trait::{FileParser, ScheduleImport, StockImport, YardImporter};
