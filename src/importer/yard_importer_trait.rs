// ==========================================
// 集装箱堆场计划系统 - 导入 Trait
// ==========================================
// 职责: 定义文件解析与堆场导入接口（不包含实现）
// 红线: 导入必须完整物化后再交给引擎层
// ==========================================

use crate::domain::schedule::ScheduleItem;
use crate::domain::stock::StockItem;
use crate::domain::types::ImportBatch;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::RawRow;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 实现者: CsvParser, ExcelParser, UniversalFileParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRow>>;
}

/// 计划导入结果
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleImport {
    pub items: Vec<ScheduleItem>,
    pub batch: ImportBatch,
}

/// 堆存导入结果（含对账诊断）
#[derive(Debug, Clone, Serialize)]
pub struct StockImport {
    pub items: Vec<StockItem>,
    pub batch: ImportBatch,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_codes: BTreeMap<String, usize>,
}

// ==========================================
// YardImporter Trait
// ==========================================
// 实现者: YardImporterImpl
#[async_trait]
pub trait YardImporter: Send + Sync {
    /// 导入作业计划
    ///
    /// # 返回
    /// - Ok(ScheduleImport): 计划项 + 批次统计（缺箱号的行被丢弃）
    /// - Err: 文件级错误（不存在、格式不支持、缺少箱号列）
    async fn import_schedule(&self, file_path: &Path) -> ImportResult<ScheduleImport>;

    /// 导入堆存快照并与计划对账
    async fn import_stock(
        &self,
        file_path: &Path,
        schedule: &[ScheduleItem],
    ) -> ImportResult<StockImport>;

    /// 同时导入两份文件（并行解析，随后对账）
    async fn import_feeds(
        &self,
        schedule_path: &Path,
        stock_path: &Path,
    ) -> ImportResult<(ScheduleImport, StockImport)>;
}
