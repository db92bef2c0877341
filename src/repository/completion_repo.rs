// ==========================================
// 集装箱堆场计划系统 - 完成标记仓储
// ==========================================
// 职责: 管理 completed_item 表（计划项完成状态，跨会话保留）
// 键: ScheduleItem::completion_key()（箱号 + 计划时间），不使用行号 ID
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

pub struct CompletionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CompletionRepository {
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

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS completed_item (
              item_key TEXT PRIMARY KEY,
              completed_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    /// 标记完成（重复标记保留首次完成时间）
    pub fn mark_done(&self, item_key: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        conn.execute(
            "INSERT OR IGNORE INTO completed_item (item_key, completed_at) VALUES (?1, ?2)",
            params![item_key, now],
        )?;
        Ok(())
    }

    /// 取消完成标记（返回是否存在）
    pub fn unmark(&self, item_key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM completed_item WHERE item_key = ?1",
            params![item_key],
        )?;
        Ok(affected > 0)
    }

    pub fn load_all(&self) -> RepositoryResult<HashSet<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT item_key FROM completed_item")?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<SqliteResult<HashSet<_>>>()?;
        Ok(keys)
    }

    /// 只保留给定集合中的键，返回删除条数（新计划导入时清理过期标记）
    pub fn retain(&self, live_keys: &HashSet<String>) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let stale: Vec<String> = {
            let mut stmt = tx.prepare("SELECT item_key FROM completed_item")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<SqliteResult<Vec<_>>>()?;
            keys.into_iter().filter(|k| !live_keys.contains(k)).collect()
        };
        for key in &stale {
            tx.execute("DELETE FROM completed_item WHERE item_key = ?1", params![key])?;
        }
        tx.commit()?;
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_unmark() {
        let repo = CompletionRepository::new(":memory:").unwrap();
        repo.mark_done("ABCU1@2023-03-15T08:00:00").unwrap();
        repo.mark_done("ABCU1@2023-03-15T08:00:00").unwrap();
        repo.mark_done("ABCU2@").unwrap();

        let done = repo.load_all().unwrap();
        assert_eq!(done.len(), 2);
        assert!(done.contains("ABCU1@2023-03-15T08:00:00"));

        assert!(repo.unmark("ABCU1@2023-03-15T08:00:00").unwrap());
        assert!(!repo.unmark("ABCU1@2023-03-15T08:00:00").unwrap());
        assert_eq!(repo.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_retain_drops_stale_keys() {
        let repo = CompletionRepository::new(":memory:").unwrap();
        repo.mark_done("ABCU1@2023-03-15T08:00:00").unwrap();
        repo.mark_done("ABCU2@").unwrap();

        let live: HashSet<String> = ["ABCU2@".to_string()].into_iter().collect();
        assert_eq!(repo.retain(&live).unwrap(), 1);
        assert_eq!(repo.load_all().unwrap(), live);
        assert_eq!(repo.retain(&live).unwrap(), 0);
    }
}
