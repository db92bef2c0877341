// ==========================================
// 集装箱堆场计划系统 - 字段映射器实现
// ==========================================
// 职责: 源列名（含别名）→ 标准字段 + 类型转换
// 规则: 行级解析失败回退为默认值并标记 warning，不阻断导入
// ==========================================

use crate::domain::schedule::RawScheduleRecord;
use crate::domain::stock::RawStockRecord;
use crate::importer::file_parser::RawRow;
use chrono::{Duration, NaiveDate, NaiveDateTime};

// ===== 列名别名 =====
pub const CONTAINER_COLUMNS: &[&str] = &["Container", "CNTR", "Contêiner", "Conteiner"];
pub const IMPORTER_COLUMNS: &[&str] = &["Importador", "Importer"];
pub const DOCUMENT_COLUMNS: &[&str] = &["Tipo Documento", "Documento", "Document Type"];
pub const QUADRA_COLUMNS: &[&str] = &["Quadra", "Quadra Base"];
pub const SERVICE_COLUMNS: &[&str] = &["Serviço", "Servico", "Service"];
pub const REMOVAL_COLUMNS: &[&str] = &["Remoções", "Remocoes", "Removals"];
pub const SCHEDULED_AT_COLUMNS: &[&str] = &["Data Agendamento", "Agendamento", "Scheduled At"];
pub const LOCATION_COLUMNS: &[&str] = &["Localização", "Localizacao", "Posição", "Posicao", "Location"];
pub const FACILITY_COLUMNS: &[&str] = &["Terminal", "Recinto", "Facility"];

/// Excel 日期序列号基准（1899-12-30）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Excel 最大合法序列号（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
];
const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d"];

pub struct FieldMapper;

impl FieldMapper {
    /// 计划行映射
    pub fn map_schedule_row(&self, row: &RawRow, row_number: usize) -> RawScheduleRecord {
        let mut has_warning = false;

        let removals = match self.get_string(row, REMOVAL_COLUMNS) {
            None => None,
            Some(value) => {
                let parsed = parse_removals(&value);
                has_warning |= parsed.is_none();
                parsed
            }
        };

        let scheduled_at = match self.get_string(row, SCHEDULED_AT_COLUMNS) {
            None => None,
            Some(value) => {
                let parsed = parse_timestamp(&value);
                has_warning |= parsed.is_none();
                parsed
            }
        };

        RawScheduleRecord {
            container_code: self.get_string(row, CONTAINER_COLUMNS),
            importer: self.get_string(row, IMPORTER_COLUMNS),
            document_type: self.get_string(row, DOCUMENT_COLUMNS),
            quadra_label: self.get_string(row, QUADRA_COLUMNS),
            service: self.get_string(row, SERVICE_COLUMNS),
            removals,
            scheduled_at,
            row_number,
            has_warning,
        }
    }

    /// 堆存行映射
    pub fn map_stock_row(&self, row: &RawRow, row_number: usize) -> RawStockRecord {
        RawStockRecord {
            container_code: self.get_string(row, CONTAINER_COLUMNS),
            location: self.get_string(row, LOCATION_COLUMNS),
            facility_code: self.get_string(row, FACILITY_COLUMNS),
            row_number,
        }
    }

    /// 按别名顺序取第一个非空值
    fn get_string(&self, row: &RawRow, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|alias| {
            row.get(*alias)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// 表头中是否存在任一别名列
    pub fn has_any_column(row: &RawRow, aliases: &[&str]) -> bool {
        aliases.iter().any(|alias| row.contains_key(*alias))
    }
}

/// 移动次数: 非负整数（兼容 "3.0"）；非法/负数返回 None
pub fn parse_removals(value: &str) -> Option<u32> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<u32>() {
        return Some(n);
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(f) if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= f64::from(u32::MAX) => {
            Some(f as u32)
        }
        _ => None,
    }
}

/// 计划时间解析: Excel 序列号 / 文本日期时间 / 纯日期
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        return excel_serial_to_datetime(serial);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Excel 日期序列号 → 本地日期时间（小数部分为当日时间，精确到秒）
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
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

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial_to_datetime(45000.0), Some(dt(2023, 3, 15, 0, 0)));
        assert_eq!(excel_serial_to_datetime(45000.5), Some(dt(2023, 3, 15, 12, 0)));
        assert_eq!(excel_serial_to_datetime(0.0), None);
        assert_eq!(excel_serial_to_datetime(f64::NAN), None);
    }

    #[test]
    fn test_text_timestamps() {
        assert_eq!(parse_timestamp("15/03/2023 08:30"), Some(dt(2023, 3, 15, 8, 30)));
        assert_eq!(parse_timestamp("2023-03-15T08:30:00"), Some(dt(2023, 3, 15, 8, 30)));
        assert_eq!(parse_timestamp("15/03/2023"), Some(dt(2023, 3, 15, 0, 0)));
        assert_eq!(parse_timestamp("amanhã"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_removals() {
        assert_eq!(parse_removals("3"), Some(3));
        assert_eq!(parse_removals("3.0"), Some(3));
        assert_eq!(parse_removals("-1"), None);
        assert_eq!(parse_removals("2.5"), None);
        assert_eq!(parse_removals("x"), None);
    }

    #[test]
    fn test_schedule_row_with_aliases() {
        let mapped = FieldMapper.map_schedule_row(
            &row(&[
                ("CNTR", " abcu 1234567 "),
                ("Servico", "VISTORIA"),
                ("Quadra", "A1 - NORTE"),
                ("Remocoes", "2"),
                ("Agendamento", "45000.25"),
            ]),
            7,
        );
        assert_eq!(mapped.container_code.as_deref(), Some("abcu 1234567"));
        assert_eq!(mapped.service.as_deref(), Some("VISTORIA"));
        assert_eq!(mapped.removals, Some(2));
        assert_eq!(mapped.scheduled_at, Some(dt(2023, 3, 15, 6, 0)));
        assert_eq!(mapped.row_number, 7);
        assert!(!mapped.has_warning);
    }

    #[test]
    fn test_schedule_row_warning_on_bad_values() {
        let mapped = FieldMapper.map_schedule_row(
            &row(&[("Container", "ABCU1"), ("Remoções", "muitas")]),
            1,
        );
        assert_eq!(mapped.removals, None);
        assert!(mapped.has_warning);
    }

    #[test]
    fn test_stock_row() {
        let mapped = FieldMapper.map_stock_row(
            &row(&[("Container", "ABCU1"), ("Posição", "A101B2"), ("Terminal", "T1")]),
            4,
        );
        assert_eq!(mapped.location.as_deref(), Some("A101B2"));
        assert_eq!(mapped.facility_code.as_deref(), Some("T1"));
    }
}
