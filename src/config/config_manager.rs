// ==========================================
// 学生批量导入系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config::{
    default_departments, default_header_rules, DepartmentOption, HeaderRule, ImportConfig,
    SecretPolicy, DEFAULT_COMMIT_RETRY_LIMIT, DEFAULT_FLUSH_BATCH_SIZE,
    DEFAULT_IDENTITY_TIMEOUT_MS, DEFAULT_LOGIN_SUFFIX, DEFAULT_MAX_ROWS_PER_IMPORT,
    DEFAULT_RETRY_BACKOFF_MS, DEFAULT_THROTTLE_MS,
};
use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::PartitionDimension;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

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
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 读取 JSON 配置，格式错误时回退默认值
    fn get_json_or_default<T>(&self, key: &str, default: T) -> ConfigResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(v) => Ok(v),
            Err(e) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    error = %e,
                    "配置格式错误，使用默认值"
                );
                Ok(default)
            }
        }
    }

    /// 获取所有 global 配置的快照
    pub fn get_config_snapshot(&self) -> ConfigResult<HashMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    // ===== 账号派生 =====

    async fn get_login_suffix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::LOGIN_SUFFIX, DEFAULT_LOGIN_SUFFIX)?;
        let value = value.trim();
        if value.is_empty() {
            Ok(DEFAULT_LOGIN_SUFFIX.to_string())
        } else {
            Ok(value.to_string())
        }
    }

    async fn get_secret_policy(&self) -> ConfigResult<SecretPolicy> {
        let mode = self.get_config_or_default(config_keys::SECRET_POLICY, "DERIVED")?;
        match mode.trim().to_uppercase().as_str() {
            "FIXED" => {
                let value = self.get_config_or_default(config_keys::SECRET_FIXED_VALUE, "123456")?;
                Ok(SecretPolicy::Fixed { value })
            }
            _ => {
                let suffix = self.get_config_or_default(config_keys::SECRET_SUFFIX, "@123")?;
                Ok(SecretPolicy::Derived { suffix })
            }
        }
    }

    // ===== 执行参数 =====

    async fn get_flush_batch_size(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::FLUSH_BATCH_SIZE, "50")?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_FLUSH_BATCH_SIZE))
    }

    async fn get_throttle_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(config_keys::THROTTLE_MS, "100")?;
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_THROTTLE_MS))
    }

    async fn get_commit_retry_limit(&self) -> ConfigResult<u32> {
        let value = self.get_config_or_default(config_keys::COMMIT_RETRY_LIMIT, "3")?;
        Ok(value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_COMMIT_RETRY_LIMIT))
    }

    async fn get_retry_backoff_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(config_keys::RETRY_BACKOFF_MS, "500")?;
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_RETRY_BACKOFF_MS))
    }

    async fn get_identity_timeout_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(config_keys::IDENTITY_TIMEOUT_MS, "10000")?;
        Ok(value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_IDENTITY_TIMEOUT_MS))
    }

    async fn get_max_rows_per_import(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(config_keys::MAX_ROWS_PER_IMPORT, "1000")?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_ROWS_PER_IMPORT))
    }

    // ===== 标签表 =====

    async fn get_partition_allowed_values(
        &self,
    ) -> ConfigResult<BTreeMap<PartitionDimension, Vec<String>>> {
        self.get_json_or_default(
            config_keys::PARTITION_ALLOWED_VALUES,
            ImportConfig::default().partition_allowed,
        )
    }

    async fn get_departments(&self) -> ConfigResult<Vec<DepartmentOption>> {
        self.get_json_or_default(config_keys::DEPARTMENTS, default_departments())
    }

    async fn get_header_rules(&self) -> ConfigResult<Vec<HeaderRule>> {
        let rules: Vec<HeaderRule> =
            self.get_json_or_default(config_keys::HEADER_RULES, default_header_rules())?;
        if rules.is_empty() {
            Ok(default_header_rules())
        } else {
            Ok(rules)
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 账号派生
    pub const LOGIN_SUFFIX: &str = "import_login_suffix";
    pub const SECRET_POLICY: &str = "import_secret_policy"; // DERIVED / FIXED
    pub const SECRET_SUFFIX: &str = "import_secret_suffix";
    pub const SECRET_FIXED_VALUE: &str = "import_secret_fixed_value";

    // 执行参数
    pub const FLUSH_BATCH_SIZE: &str = "import_flush_batch_size";
    pub const THROTTLE_MS: &str = "import_throttle_ms";
    pub const COMMIT_RETRY_LIMIT: &str = "import_commit_retry_limit";
    pub const RETRY_BACKOFF_MS: &str = "import_retry_backoff_ms";
    pub const IDENTITY_TIMEOUT_MS: &str = "import_identity_timeout_ms";
    pub const MAX_ROWS_PER_IMPORT: &str = "import_max_rows";

    // 标签表 (JSON)
    pub const PARTITION_ALLOWED_VALUES: &str = "import_partition_allowed_values";
    pub const DEPARTMENTS: &str = "import_departments";
    pub const HEADER_RULES: &str = "import_header_rules";
}
