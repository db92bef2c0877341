// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、临时 CSV 文件、配置写入
// ==========================================

#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::error::Error;
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

/// 创建临时测试数据库
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = Builder::new().suffix(".db").tempfile()?;
    let db_path = temp_file.path().to_string_lossy().to_string();
    Ok((temp_file, db_path))
}

/// 写入 global 配置（表不存在时创建）
pub fn insert_test_config(db_path: &str, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

/// 写出临时 CSV 文件（每个元素一行）
pub fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = Builder::new()
        .suffix(".csv")
        .tempfile()
        .expect("Failed to create temp csv");
    for line in lines {
        writeln!(file, "{}", line).expect("Failed to write temp csv");
    }
    file.flush().expect("Failed to flush temp csv");
    file
}

/// 标准计划文件（3 个箱，ABCU0000002 出现两次）
pub fn schedule_csv() -> NamedTempFile {
    write_csv(&[
        "Container,Importador,Tipo Documento,Quadra,Serviço,Remoções,Data Agendamento",
        "ABCU0000001,ACME,DI,A1 - NORTE,VISTORIA,3,15/03/2023 08:00",
        "abcu-000000-2,ACME,DI,A1 - NORTE,VISTORIA,1,15/03/2023 09:00",
        "ABCU0000003,GLOBEX,DTA,B2 - SUL,DESOVA,5,16/03/2023 10:00",
        "ABCU0000002,ACME,DI,B2 - SUL,PESAGEM,2,16/03/2023 11:00",
        ",ACME,DI,A1,VISTORIA,1,15/03/2023 08:00",
    ])
}

/// 标准堆存文件（1 个不符合场站要求的行）
pub fn stock_csv() -> NamedTempFile {
    write_csv(&[
        "Container,Localização,Terminal",
        "ABCU0000001,A101B5,T1",
        "ABCU0000002,A101C2,T1",
        "ABCU0000003,B203A1,T1",
        "ZZZU9999999,A102A1,T1",
        "ABCU0000009,A101B3,T9",
    ])
}
