// ==========================================
// 集装箱堆场计划系统 - 机组作业参数仓储
// ==========================================
// 职责: 管理 stacker_config 表（每台机组一行: 开工时间 + 每小时移动次数）
// 说明: 读取时统一经 StackerConfig::new 校正，库中脏数据不会进入计划面板
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::stacker::{parse_time_of_day, MachineId, StackerConfig};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 机组参数存储接口
///
/// 实现者: StackerConfigRepository（SQLite）；测试中可替换为内存实现
pub trait StackerConfigStore: Send + Sync {
    /// 读取全部机组参数
    fn load_all(&self) -> RepositoryResult<HashMap<MachineId, StackerConfig>>;

    /// 保存（覆盖）单台机组参数
    fn save(&self, machine: &str, config: &StackerConfig) -> RepositoryResult<()>;
}

pub struct StackerConfigRepository {
    conn: Arc<Mutex<Connection>>,
}

impl StackerConfigRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        repo.ensure_table()?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 确保表存在（如果不存在则创建）
    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS stacker_config (
              machine_id TEXT PRIMARY KEY,
              start_time TEXT NOT NULL,
              rate INTEGER NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl StackerConfigStore for StackerConfigRepository {
    fn load_all(&self) -> RepositoryResult<HashMap<MachineId, StackerConfig>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT machine_id, start_time, rate
            FROM stacker_config
            ORDER BY machine_id ASC
            "#,
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut configs = HashMap::with_capacity(rows.len());
        for (machine, start_text, rate) in rows {
            let Some(start) = parse_time_of_day(&start_text) else {
                warn!(machine = %machine, start_time = %start_text, "开工时间无法解析，跳过该机组");
                continue;
            };
            configs.insert(machine, StackerConfig::new(start, rate));
        }
        Ok(configs)
    }

    fn save(&self, machine: &str, config: &StackerConfig) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            r#"
            INSERT INTO stacker_config (machine_id, start_time, rate, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(machine_id) DO UPDATE SET
                start_time = excluded.start_time,
                rate = excluded.rate,
                updated_at = excluded.updated_at
            "#,
            params![machine, config.start_label(), i64::from(config.rate), now],
        )?;
        Ok(())
    }
}
