// ==========================================
// 学生批量导入系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 仅文件级错误与提交耗尽会终止操作；行级问题作为数据返回
// ==========================================

use crate::domain::types::CanonicalField;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.xlsm/.ods/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("表格解析失败: {0}")]
    Decode(String),

    // ===== 文件级校验错误 =====
    #[error("数据行数 {rows} 超过单次导入上限 {max}")]
    TooManyRows { rows: usize, max: usize },

    #[error("必需字段未映射: {}", format_fields(.missing))]
    MappingIncomplete { missing: Vec<CanonicalField> },

    // ===== 执行错误 =====
    #[error("已有导入任务正在运行")]
    RunAlreadyActive,

    #[error("仓储错误: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置读取失败: {0}")]
    Config(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Decode(format!("CSV: {}", err))
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::Decode(format!("Excel: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
