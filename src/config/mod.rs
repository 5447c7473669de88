// ==========================================
// 学生批量导入系统 - 配置层
// ==========================================
// 职责: 导入配置值 + 配置读取接口 + config_kv 实现
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config;
pub mod import_config_trait;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use import_config::{
    DepartmentOption, FieldClass, FieldRule, HeaderMatcher, HeaderRule, ImportConfig,
    SecretPolicy,
};
pub use import_config_trait::ImportConfigReader;
