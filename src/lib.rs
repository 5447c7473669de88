// ==========================================
// 学生批量导入系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite) + calamine/csv
// 流程: 解析 → 表头推断 → 标准化 → 校验 → 确认分区 → 执行
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 存储与账号开通边界
pub mod repository;

// 引擎层 - 导入执行
pub mod engine;

// 导入层 - 解析/映射/清洗/校验
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CanonicalField, CellValue, PartitionDimension, RunState, ValidationErrorKind};

// 领域实体
pub use domain::{
    CanonicalRecord, HeaderMapping, ImportRun, ImportRunReport, PartitionKey, PartitionStrategy,
    StudentProfile,
};

// 配置
pub use config::ImportConfig;

// 导入与执行
pub use engine::{ImportExecutor, ImportJob, ImportProgress};
pub use importer::{ImportError, ImportPipeline, ImportResult, PrepareOptions, PreparedImport};

// API
pub use api::{ApiError, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学生批量导入系统";
