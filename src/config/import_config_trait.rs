// ==========================================
// 学生批量导入系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::import_config::{
    DepartmentOption, HeaderRule, ImportConfig, SecretPolicy,
};
use crate::domain::types::PartitionDimension;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 账号派生 =====

    /// 获取登录账号后缀
    ///
    /// # 默认值
    /// - "@mits.ac.in"
    async fn get_login_suffix(&self) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// 获取初始密码策略
    ///
    /// # 默认值
    /// - Derived { suffix: "@123" }
    async fn get_secret_policy(&self) -> Result<SecretPolicy, Box<dyn Error + Send + Sync>>;

    // ===== 执行参数 =====

    /// 每批提交记录数（默认 50）
    async fn get_flush_batch_size(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 记录间节流间隔毫秒（默认 100）
    async fn get_throttle_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 批量提交最大尝试次数（默认 3）
    async fn get_commit_retry_limit(&self) -> Result<u32, Box<dyn Error + Send + Sync>>;

    /// 提交重试间隔毫秒（默认 500）
    async fn get_retry_backoff_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 账号开通超时毫秒（默认 10000）
    async fn get_identity_timeout_ms(&self) -> Result<u64, Box<dyn Error + Send + Sync>>;

    /// 单次导入最大数据行数（默认 1000）
    async fn get_max_rows_per_import(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    // ===== 标签表 =====

    /// 分区维度允许值
    ///
    /// # 存储格式
    /// JSON: {"department": ["CSE", ...], "year": ["I", ...], "section": ["A", ...]}
    async fn get_partition_allowed_values(
        &self,
    ) -> Result<BTreeMap<PartitionDimension, Vec<String>>, Box<dyn Error + Send + Sync>>;

    /// 院系选项
    async fn get_departments(&self) -> Result<Vec<DepartmentOption>, Box<dyn Error + Send + Sync>>;

    /// 表头匹配规则表（未配置时使用内置顺序）
    async fn get_header_rules(&self) -> Result<Vec<HeaderRule>, Box<dyn Error + Send + Sync>>;

    /// 组装完整 ImportConfig
    async fn load_import_config(&self) -> Result<ImportConfig, Box<dyn Error + Send + Sync>> {
        let defaults = ImportConfig::default();
        Ok(ImportConfig {
            header_rules: self.get_header_rules().await?,
            field_rules: defaults.field_rules,
            partition_allowed: self.get_partition_allowed_values().await?,
            departments: self.get_departments().await?,
            login_suffix: self.get_login_suffix().await?,
            secret_policy: self.get_secret_policy().await?,
            flush_batch_size: self.get_flush_batch_size().await?,
            throttle_ms: self.get_throttle_ms().await?,
            commit_retry_limit: self.get_commit_retry_limit().await?,
            retry_backoff_ms: self.get_retry_backoff_ms().await?,
            identity_timeout_ms: self.get_identity_timeout_ms().await?,
            max_rows_per_import: self.get_max_rows_per_import().await?,
        })
    }
}
