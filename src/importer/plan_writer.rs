// ==========================================
// 集装箱堆场计划系统 - 作业计划导出
// ==========================================
// 输出: CSV（Seq, ETA, Container, Service, Location, Quadra）
// ==========================================

use crate::engine::planning::PlanExportRow;
use crate::importer::error::{ImportError, ImportResult};
use csv::WriterBuilder;
use std::io::Write;

pub const PLAN_CSV_HEADERS: [&str; 6] = ["Seq", "ETA", "Container", "Service", "Location", "Quadra"];

/// 按队列顺序写出作业计划
pub fn write_plan_csv<W: Write>(writer: W, rows: &[PlanExportRow]) -> ImportResult<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(PLAN_CSV_HEADERS)?;

    for row in rows {
        csv_writer.write_record([
            row.sequence.to_string().as_str(),
            row.eta.as_str(),
            row.container_code.as_str(),
            row.service.as_str(),
            row.location.as_str(),
            row.quadra.as_str(),
        ])?;
    }

    csv_writer
        .flush()
        .map_err(|e| ImportError::ExportError(e.to_string()))
}

/// 导出为内存字符串（供 API 直接返回）
pub fn plan_csv_string(rows: &[PlanExportRow]) -> ImportResult<String> {
    let mut buffer = Vec::new();
    write_plan_csv(&mut buffer, rows)?;
    String::from_utf8(buffer).map_err(|e| ImportError::ExportError(e.to_string()))
}
