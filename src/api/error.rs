// ==========================================
// 学生批量导入系统 - API层错误类型
// ==========================================
// 职责: 转换 Importer/Repository 错误为用户友好的错误消息
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 已有导入运行中
    #[error("导入进行中，请等待当前运行结束")]
    RunInProgress,

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseBusy(msg) => {
                ApiError::DatabaseError(format!("数据库繁忙: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            ImportError::RunAlreadyActive => ApiError::RunInProgress,
            ImportError::MappingIncomplete { .. } | ImportError::TooManyRows { .. } => {
                ApiError::ValidationError(err.to_string())
            }
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::Config(msg) => ApiError::InvalidInput(format!("配置错误: {}", msg)),
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(e) => ApiError::Other(e),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CanonicalField;

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::DatabaseConnectionError(_)));

        let api_err: ApiError = RepositoryError::FieldValueError {
            field: "fields_json".to_string(),
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(api_err.to_string(), "无效输入: 字段fields_json错误: bad");
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::MappingIncomplete {
            missing: vec![CanonicalField::RollNumber],
        }
        .into();
        assert!(matches!(api_err, ApiError::ValidationError(_)));

        let api_err: ApiError = ImportError::RunAlreadyActive.into();
        assert!(matches!(api_err, ApiError::RunInProgress));

        let api_err: ApiError = ImportError::Decode("坏文件".to_string()).into();
        assert!(matches!(api_err, ApiError::ImportError(_)));
    }
}
