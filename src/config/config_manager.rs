// ==========================================
// 集装箱堆场计划系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (scope_id + key → value)，当前只使用 global 作用域
// 规则: 缺失或非法值回退默认值并记录 warn，不报错
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::stacker::{
    parse_time_of_day, sanitize_rate, MachineId, StackerConfig, DEFAULT_MACHINE_IDS,
};
use crate::importer::error::{ImportError, ImportResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(|e| config_error("open", e))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建 ConfigManager（与仓储共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        let manager = Self { conn };
        manager.ensure_table()?;
        Ok(manager)
    }

    fn lock(&self) -> ImportResult<std::sync::MutexGuard<Connection>> {
        self.conn.lock().map_err(|e| ImportError::ConfigReadError {
            key: "*".to_string(),
            message: format!("锁获取失败: {}", e),
        })
    }

    fn ensure_table(&self) -> ImportResult<()> {
        let conn = self.lock()?;
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
        )
        .map_err(|e| config_error("config_kv", e))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| config_error(key, e))
    }

    /// 写入 global scope 的配置值（Upsert）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![GLOBAL_SCOPE, key, value],
        )
        .map_err(|e| config_error(key, e))?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有配置的快照（JSON 格式，按 key 排序）
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")
            .map_err(|e| config_error("*", e))?;

        let rows = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| config_error("*", e))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| config_error("*", e))?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map)).map_err(|e| ImportError::ConfigReadError {
            key: "*".to_string(),
            message: e.to_string(),
        })
    }

    // ===== 导入配置 =====

    /// 堆存行要求的场站代码（None 表示不过滤）
    pub fn get_required_facility_code(&self) -> ImportResult<Option<String>> {
        let value = self.get_config_or_default(config_keys::REQUIRED_FACILITY_CODE, "")?;
        let trimmed = value.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_uppercase()))
    }

    // ===== 计划配置 =====

    /// 参与排队的机组集合（逗号分隔，去空、去重、保持顺序）
    pub fn get_machine_ids(&self) -> ImportResult<Vec<MachineId>> {
        let default = DEFAULT_MACHINE_IDS.join(",");
        let value = self.get_config_or_default(config_keys::MACHINE_IDS, &default)?;

        let mut ids: Vec<MachineId> = Vec::new();
        for id in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if !ids.iter().any(|existing| existing == id) {
                ids.push(id.to_string());
            }
        }

        if ids.is_empty() {
            warn!(config_key = config_keys::MACHINE_IDS, raw_value = %value, "机组集合为空，使用默认机组");
            ids = DEFAULT_MACHINE_IDS.iter().map(|s| s.to_string()).collect();
        }
        Ok(ids)
    }

    /// 未单独配置机组时的默认参数
    pub fn get_default_stacker_config(&self) -> ImportResult<StackerConfig> {
        let fallback = StackerConfig::default();

        let rate_text = self.get_config_or_default(
            config_keys::DEFAULT_RATE,
            &fallback.rate.to_string(),
        )?;
        let rate = match rate_text.trim().parse::<i64>() {
            Ok(rate) => {
                if rate < 1 {
                    warn!(config_key = config_keys::DEFAULT_RATE, rate, "默认效率非法，钳制为最低值");
                }
                sanitize_rate(rate)
            }
            Err(_) => {
                warn!(config_key = config_keys::DEFAULT_RATE, raw_value = %rate_text, "默认效率格式错误，使用内置默认值");
                fallback.rate
            }
        };

        let start_text = self.get_config_or_default(
            config_keys::DEFAULT_START,
            &fallback.start_label(),
        )?;
        let start = parse_time_of_day(&start_text).unwrap_or_else(|| {
            warn!(config_key = config_keys::DEFAULT_START, raw_value = %start_text, "默认开工时间格式错误，使用内置默认值");
            fallback.start
        });

        Ok(StackerConfig::new(start, i64::from(rate)))
    }
}

fn config_error(key: &str, err: rusqlite::Error) -> ImportError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message: err.to_string(),
    }
}

// ==========================================
// 默认数据库路径
// ==========================================

/// 获取默认数据库路径
///
/// 顺序: 环境变量 YARD_PLANNER_DB_PATH → 用户数据目录/yard-planner/yard_planner.db → ./yard_planner.db
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./yard_planner.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("yard-planner");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("yard_planner.db");
        }
    }

    path.to_string_lossy().to_string()
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "YARD_PLANNER_DB_PATH";

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const REQUIRED_FACILITY_CODE: &str = "import.required_facility_code";

    // 计划
    pub const MACHINE_IDS: &str = "planning.machine_ids";
    pub const DEFAULT_RATE: &str = "planning.default_rate";
    pub const DEFAULT_START: &str = "planning.default_start";
}
