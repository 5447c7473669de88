// ==========================================
// 学生批量导入系统 - 导入层
// ==========================================
// 职责: 文件解析、表头推断、清洗标准化、校验查重
// 支持: Excel (xlsx/xls/xlsm/ods), CSV
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod data_cleaner;
pub mod derivation;
pub mod dq_validator;
pub mod error;
pub mod file_parser;
pub mod header_mapper;
pub mod import_pipeline;
pub mod import_trait;
pub mod partition_detector;
pub mod record_normalizer;
pub mod template;

// 重导出核心类型
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use data_cleaner::DataCleaner as DataCleanerImpl;
pub use derivation::DerivationService as DerivationServiceImpl;
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use header_mapper::HeaderMapper as HeaderMapperImpl;
pub use import_pipeline::{ImportPipeline, PrepareOptions, PreparedImport, SheetPreview};
pub use partition_detector::{PartitionDetector as PartitionDetectorImpl, PartitionSummary};
pub use record_normalizer::RecordNormalizer as RecordNormalizerImpl;

// 重导出 Trait 接口
pub use import_trait::{
    ConflictHandler, DataCleaner, DerivationService, DqValidator, FileParser, HeaderMapper,
    PartitionDetector, RecordNormalizer,
};
