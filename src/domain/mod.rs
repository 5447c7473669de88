// ==========================================
// 学生批量导入系统 - 领域模型层
// ==========================================
// 职责: 定义导入管道的领域实体与类型
// 红线: 不含数据访问逻辑,不含执行逻辑
// ==========================================

pub mod import_run;
pub mod student;
pub mod types;

// 重导出核心类型
pub use import_run::{
    AbortReason, IdentityOutcome, ImportRun, ImportRunReport, RowOutcome, RowStatus, RunEvent,
};
pub use student::{
    BatchCommit, CanonicalRecord, DecodedSheet, HeaderMapping, MappingWarning, PartitionHint,
    PartitionKey, PartitionStrategy, RawRow, SkippedRow, StudentProfile, ValidationIssue, ValidationResult,
};
pub use types::{CanonicalField, CellValue, PartitionDimension, RunState, ValidationErrorKind};
