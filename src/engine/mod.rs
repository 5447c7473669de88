// ==========================================
// 学生批量导入系统 - 引擎层
// ==========================================
// 职责: 执行已确认的导入（查重/开通账号/分批提交）
// 红线: Engine 不拼 SQL，所有存储访问经由 Repository 边界
// ==========================================

pub mod import_executor;

// 重导出核心引擎
pub use import_executor::{ExecutorOptions, ImportExecutor, ImportJob, ImportProgress};
