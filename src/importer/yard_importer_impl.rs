// ==========================================
// 集装箱堆场计划系统 - 堆场导入器实现
// ==========================================
// 流程: 解析（后台线程）→ 字段映射 → 丢弃缺主键行 → 规范化 → 对账
// 说明: 文件解析是唯一的异步边界；引擎层只接收完整物化的集合
// ==========================================

use crate::domain::schedule::{RawScheduleRecord, ScheduleItem};
use crate::domain::types::{ImportBatch, ImportKind};
use crate::engine::identity::normalize_code;
use crate::engine::reconciler::{AcceptAll, FacilityCodeFilter, Reconciler, StockEligibility};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{FieldMapper, CONTAINER_COLUMNS, LOCATION_COLUMNS};
use crate::importer::file_parser::{RawRow, UniversalFileParser};
use crate::importer::yard_importer_trait::{FileParser, ScheduleImport, StockImport, YardImporter};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

// ==========================================
// YardImporterImpl - 堆场导入器实现
// ==========================================
pub struct YardImporterImpl {
    file_parser: Arc<dyn FileParser>,
    field_mapper: FieldMapper,
    reconciler: Reconciler,
    eligibility: Arc<dyn StockEligibility>,
}

impl YardImporterImpl {
    pub fn new(file_parser: Arc<dyn FileParser>, eligibility: Arc<dyn StockEligibility>) -> Self {
        Self {
            file_parser,
            field_mapper: FieldMapper,
            reconciler: Reconciler::new(),
            eligibility,
        }
    }

    /// 按场站代码过滤堆存行（None/空串表示不过滤）
    pub fn with_required_facility(required_facility: Option<&str>) -> Self {
        let eligibility: Arc<dyn StockEligibility> = match required_facility.map(str::trim) {
            Some(code) if !code.is_empty() => Arc::new(FacilityCodeFilter::new(code)),
            _ => Arc::new(AcceptAll),
        };
        Self::new(Arc::new(UniversalFileParser), eligibility)
    }

    /// 在阻塞线程池中解析文件
    async fn parse_file(&self, file_path: &Path) -> ImportResult<Vec<RawRow>> {
        let parser = Arc::clone(&self.file_parser);
        let path = file_path.to_path_buf();
        let rows = tokio::task::spawn_blocking(move || parser.parse_to_raw_records(&path)).await??;
        debug!(rows = rows.len(), file = %file_path.display(), "文件解析完成");
        Ok(rows)
    }

    fn require_column(rows: &[RawRow], kind: ImportKind, aliases: &[&str]) -> ImportResult<()> {
        if rows.is_empty() || rows.iter().any(|r| FieldMapper::has_any_column(r, aliases)) {
            return Ok(());
        }
        Err(ImportError::MissingColumn {
            kind: kind.to_string(),
            expected: aliases.join(" | "),
        })
    }

    /// 计划行 → ScheduleItem
    pub fn build_schedule(
        &self,
        rows: &[RawRow],
        file_name: Option<String>,
        started: Instant,
    ) -> ImportResult<ScheduleImport> {
        Self::require_column(rows, ImportKind::Schedule, CONTAINER_COLUMNS)?;

        let records: Vec<RawScheduleRecord> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.field_mapper.map_schedule_row(row, idx + 1))
            .collect();

        let warning_rows = records.iter().filter(|r| r.has_warning).count();
        let items: Vec<ScheduleItem> = records.into_iter().filter_map(to_schedule_item).collect();

        let batch = new_batch(
            ImportKind::Schedule,
            file_name,
            rows.len(),
            items.len(),
            warning_rows,
            started,
        );
        info!(
            batch_id = %batch.batch_id,
            accepted = batch.accepted_rows,
            discarded = batch.discarded_rows,
            warnings = batch.warning_rows,
            "计划导入完成"
        );

        Ok(ScheduleImport { items, batch })
    }

    /// 堆存行 → StockItem（与计划对账）
    pub fn build_stock(
        &self,
        rows: &[RawRow],
        schedule: &[ScheduleItem],
        file_name: Option<String>,
        started: Instant,
    ) -> ImportResult<StockImport> {
        Self::require_column(rows, ImportKind::Stock, CONTAINER_COLUMNS)?;
        Self::require_column(rows, ImportKind::Stock, LOCATION_COLUMNS)?;

        let records = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| self.field_mapper.map_stock_row(row, idx + 1));
        let outcome = self
            .reconciler
            .reconcile(schedule, records, self.eligibility.as_ref());

        let batch = new_batch(
            ImportKind::Stock,
            file_name,
            rows.len(),
            outcome.items.len(),
            0,
            started,
        );
        info!(
            batch_id = %batch.batch_id,
            accepted = batch.accepted_rows,
            discarded = batch.discarded_rows,
            "堆存导入完成"
        );

        Ok(StockImport {
            items: outcome.items,
            batch,
            matched: outcome.matched,
            unmatched: outcome.unmatched,
            duplicate_codes: outcome.duplicate_codes,
        })
    }
}

#[async_trait::async_trait]
impl YardImporter for YardImporterImpl {
    #[instrument(skip(self), fields(file = %file_path.display()))]
    async fn import_schedule(&self, file_path: &Path) -> ImportResult<ScheduleImport> {
        let started = Instant::now();
        let rows = self.parse_file(file_path).await?;
        self.build_schedule(&rows, file_name_of(file_path), started)
    }

    #[instrument(skip(self, schedule), fields(file = %file_path.display()))]
    async fn import_stock(
        &self,
        file_path: &Path,
        schedule: &[ScheduleItem],
    ) -> ImportResult<StockImport> {
        let started = Instant::now();
        let rows = self.parse_file(file_path).await?;
        self.build_stock(&rows, schedule, file_name_of(file_path), started)
    }

    #[instrument(skip(self))]
    async fn import_feeds(
        &self,
        schedule_path: &Path,
        stock_path: &Path,
    ) -> ImportResult<(ScheduleImport, StockImport)> {
        let started = Instant::now();
        let (schedule_rows, stock_rows) =
            futures::try_join!(self.parse_file(schedule_path), self.parse_file(stock_path))?;

        let schedule = self.build_schedule(&schedule_rows, file_name_of(schedule_path), started)?;
        let stock = self.build_stock(
            &stock_rows,
            &schedule.items,
            file_name_of(stock_path),
            started,
        )?;
        Ok((schedule, stock))
    }
}

/// 中间记录 → 计划项；缺箱号的行返回 None
fn to_schedule_item(record: RawScheduleRecord) -> Option<ScheduleItem> {
    let code = normalize_code(record.container_code.as_deref().unwrap_or(""));
    if code.is_empty() {
        debug!(row_number = record.row_number, "缺少箱号，丢弃计划行");
        return None;
    }
    Some(ScheduleItem::new(
        format!("SCH-{:05}", record.row_number),
        record.importer.unwrap_or_default(),
        code,
        record.document_type.unwrap_or_default(),
        record.quadra_label.unwrap_or_default(),
        record.service.unwrap_or_default(),
        record.removals.unwrap_or(0),
        record.scheduled_at,
    ))
}

fn new_batch(
    kind: ImportKind,
    file_name: Option<String>,
    total_rows: usize,
    accepted_rows: usize,
    warning_rows: usize,
    started: Instant,
) -> ImportBatch {
    ImportBatch {
        batch_id: Uuid::new_v4().to_string(),
        kind,
        file_name,
        total_rows,
        accepted_rows,
        discarded_rows: total_rows.saturating_sub(accepted_rows),
        warning_rows,
        imported_at: Utc::now(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

fn file_name_of(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_build_schedule_discards_rows_without_code() {
        let importer = YardImporterImpl::with_required_facility(None);
        let rows = vec![
            row(&[("Container", "abcu-1"), ("Serviço", "VISTORIA"), ("Remoções", "2")]),
            row(&[("Container", ""), ("Serviço", "VISTORIA")]),
        ];
        let result = importer.build_schedule(&rows, None, Instant::now()).unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].id, "SCH-00001");
        assert_eq!(result.items[0].container_code, "ABCU1");
        assert_eq!(result.items[0].removals, 2);
        assert_eq!(result.batch.discarded_rows, 1);
    }

    #[test]
    fn test_missing_container_column() {
        let importer = YardImporterImpl::with_required_facility(None);
        let rows = vec![row(&[("Navio", "MSC")])];
        let result = importer.build_schedule(&rows, None, Instant::now());
        assert!(matches!(result, Err(ImportError::MissingColumn { .. })));
    }

    #[test]
    fn test_build_stock_with_facility_filter() {
        let importer = YardImporterImpl::with_required_facility(Some("T1"));
        let schedule = vec![ScheduleItem::new(
            "SCH-00001", "ACME", "ABCU1", "DI", "A1", "VISTORIA", 1, None,
        )];
        let rows = vec![
            row(&[("Container", "ABCU1"), ("Localização", "A101B2"), ("Terminal", "T1")]),
            row(&[("Container", "ABCU2"), ("Localização", "A101B3"), ("Terminal", "T9")]),
        ];
        let result = importer
            .build_stock(&rows, &schedule, None, Instant::now())
            .unwrap();

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.matched, 1);
        assert_eq!(result.batch.discarded_rows, 1);
        assert_eq!(result.items[0].service, "VISTORIA");
    }
}
