// ==========================================
// 学生批量导入系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供存储/账号开通边界,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod identity_repo;
pub mod import_run_repo;
pub mod student_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use identity_repo::{IdentityError, IdentityProvider, IdentityRecord, IdentityRepositoryImpl};
pub use import_run_repo::{ImportRunEntity, ImportRunRepository};
pub use student_repo::{StudentRepositoryImpl, StudentStore};
