// ==========================================
// 学生批量导入系统 - 导入管道 Trait
// ==========================================
// 职责: 定义导入各阶段接口（不包含实现）
// 流程: 解析 → 表头映射 → 清洗/派生/标准化 → 分区探测 → 校验/查重
// ==========================================

use crate::domain::student::{
    CanonicalRecord, DecodedSheet, HeaderMapping, MappingWarning, PartitionHint, PartitionKey,
    RawRow, SkippedRow, StudentProfile, ValidationResult,
};
use crate::domain::types::CanonicalField;
use crate::importer::error::ImportResult;
use crate::importer::partition_detector::PartitionSummary;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 1）
// 实现者: ExcelParser, CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件的第一个工作表
    ///
    /// # 返回
    /// - Ok(DecodedSheet): 表头 + 非空数据行
    /// - Err: 文件不存在、格式错误、无数据行
    fn parse_first_sheet(&self, file_path: &Path) -> ImportResult<DecodedSheet>;

    /// 解析文件的全部工作表（无数据的工作表被跳过）
    fn parse_all_sheets(&self, file_path: &Path) -> ImportResult<Vec<DecodedSheet>>;
}

// ==========================================
// HeaderMapper Trait
// ==========================================
// 用途: 表头推断接口（阶段 2）
// 实现者: HeaderMapper
pub trait HeaderMapper: Send + Sync {
    /// 根据表头文本推断列映射
    ///
    /// # 返回
    /// - HeaderMapping: 列 → 标准字段
    /// - Vec<MappingWarning>: 未识别表头 / 重复映射
    fn map_headers(&self, headers: &[String]) -> (HeaderMapping, Vec<MappingWarning>);
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 单元格值清洗接口（阶段 3）
// 实现者: DataCleaner
pub trait DataCleaner: Send + Sync {
    /// TRIM + 内部空白折叠
    fn clean_text(&self, value: &str) -> String;

    /// 仅保留数字
    fn digits_only(&self, value: &str) -> String;

    /// 是否为占位符（"-" / "NA" / "Unknown" 等）
    fn is_placeholder(&self, value: &str) -> bool;

    /// 年级 → 罗马数字（"3" / "3rd Year" / "Third" → "III"）
    fn to_roman_year(&self, value: &str) -> Option<String>;

    /// Excel 日期序列号 → 日期
    fn excel_serial_to_date(&self, serial: f64) -> Option<NaiveDate>;

    /// 按字段清洗
    ///
    /// # 返回
    /// - Some(String): 清洗后的非空值
    /// - None: 空值或占位符
    fn clean_field(&self, field: CanonicalField, raw: &str) -> Option<String>;
}

// ==========================================
// DerivationService Trait
// ==========================================
// 用途: 派生字段接口（阶段 3 / 执行阶段）
// 实现者: DerivationService
pub trait DerivationService: Send + Sync {
    /// 登录账号 = 小写字母数字学号 + 后缀
    fn derive_login_identifier(&self, roll_number: &str) -> String;

    /// 初始密码（按配置策略，确定性）
    fn derive_initial_secret(&self, roll_number: &str) -> String;

    /// 构建落库档案文档
    ///
    /// # 参数
    /// - record: 标准记录
    /// - partition: 分区键
    /// - auth_uid: 账号 uid（开通失败时为 None）
    /// - run_id: 运行 ID
    /// - imported_at: 导入时间
    fn build_profile(
        &self,
        record: &CanonicalRecord,
        partition: &PartitionKey,
        auth_uid: Option<&str>,
        run_id: &str,
        imported_at: DateTime<Utc>,
    ) -> StudentProfile;
}

// ==========================================
// RecordNormalizer Trait
// ==========================================
// 用途: 原始行 → 标准记录（阶段 3）
// 实现者: RecordNormalizer
pub trait RecordNormalizer: Send + Sync {
    /// 标准化单行
    ///
    /// # 参数
    /// - mapping: 表头映射（同一文件所有行共用）
    /// - row: 原始行
    /// - hint: 分区提示（来自工作表名或操作员），用于回填空值
    ///
    /// # 返回
    /// - Ok(CanonicalRecord)
    /// - Err(SkippedRow): 学号或姓名为空
    fn normalize(
        &self,
        mapping: &HeaderMapping,
        row: &RawRow,
        hint: Option<&PartitionHint>,
    ) -> Result<CanonicalRecord, SkippedRow>;
}

// ==========================================
// PartitionDetector Trait
// ==========================================
// 用途: 分区值探测（信息性，不会失败）
// 实现者: PartitionDetector
pub trait PartitionDetector: Send + Sync {
    fn detect(&self, records: &[CanonicalRecord]) -> PartitionSummary;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 数据质量校验接口（阶段 4）
// 实现者: DqValidator
pub trait DqValidator: Send + Sync {
    /// 文件级: 必需字段是否已映射
    fn validate_mapping(&self, mapping: &HeaderMapping) -> ImportResult<()>;

    /// 文件级: 数据行数上限
    fn validate_row_count(&self, rows: usize) -> ImportResult<()>;

    /// 记录级: 字段规则
    fn validate_record(&self, record: &CanonicalRecord) -> ValidationResult;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 文件内重复检测
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测文件内重复学号（首次出现保留，后续出现报告）
    ///
    /// # 返回
    /// - Vec<(usize, String)>: (记录下标, 学号)
    fn detect_duplicates(&self, records: &[CanonicalRecord]) -> Vec<(usize, String)>;
}
