// ==========================================
// 学生批量导入系统 - 导入预览管道
// ==========================================
// 职责: 组合阶段 1-5，产出可供操作员确认的 PreparedImport
// 流程: 解析 → 表头映射 → 标准化 → 校验/查重 → 分区探测
// 说明: 无副作用；执行阶段见 engine::import_executor
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::domain::student::{
    CanonicalRecord, DecodedSheet, HeaderMapping, MappingWarning, PartitionHint, SkippedRow,
    ValidationIssue, ValidationResult,
};
use crate::domain::types::{CanonicalField, ValidationErrorKind};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::dq_validator::DqValidator;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::{ExcelParser, UniversalFileParser};
use crate::importer::header_mapper::HeaderMapper;
use crate::importer::import_trait::{
    ConflictHandler as _, DqValidator as _, FileParser, HeaderMapper as _,
    PartitionDetector as _,
};
use crate::importer::partition_detector::{PartitionDetector, PartitionSummary};
use crate::importer::record_normalizer::RecordNormalizer;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// PrepareOptions - 预览选项
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PrepareOptions {
    /// 解析全部工作表（否则只解析第一个）
    pub all_sheets: bool,
    /// 操作员对列映射的覆写（列序号, 字段），应用于每个工作表
    pub mapping_overrides: Vec<(usize, Option<CanonicalField>)>,
}

// ==========================================
// SheetPreview - 单个工作表的映射结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetPreview {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub mapping: HeaderMapping,
    pub warnings: Vec<MappingWarning>,
    pub hint: PartitionHint, // 由工作表名解析（仅多表模式）
    pub row_count: usize,
}

// ==========================================
// PreparedImport - 预览结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedImport {
    pub sheets: Vec<SheetPreview>,
    pub records: Vec<CanonicalRecord>,      // 文件顺序
    pub record_issues: Vec<ValidationResult>, // 与 records 一一对应
    pub skipped: Vec<SkippedRow>,
    pub partitions: PartitionSummary,
}

impl PreparedImport {
    /// 可导入记录（无校验问题，保持文件顺序）
    pub fn eligible_records(&self) -> Vec<CanonicalRecord> {
        self.records
            .iter()
            .zip(self.record_issues.iter())
            .filter(|(_, issues)| issues.is_empty())
            .map(|(record, _)| record.clone())
            .collect()
    }

    pub fn eligible_count(&self) -> usize {
        self.record_issues.iter().filter(|i| i.is_empty()).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.records.len() - self.eligible_count()
    }

    /// 全部校验问题（扁平化）
    pub fn issues(&self) -> Vec<&ValidationIssue> {
        self.record_issues.iter().flatten().collect()
    }

    pub fn warnings(&self) -> Vec<&MappingWarning> {
        self.sheets.iter().flat_map(|s| s.warnings.iter()).collect()
    }
}

// ==========================================
// ImportPipeline
// ==========================================
pub struct ImportPipeline {
    config: ImportConfig,

    // 导入组件
    file_parser: UniversalFileParser,
    header_mapper: HeaderMapper,
    normalizer: RecordNormalizer,
    partition_detector: PartitionDetector,
    dq_validator: DqValidator,
    conflict_handler: ConflictHandler,
}

impl ImportPipeline {
    pub fn new(config: ImportConfig) -> Self {
        Self {
            file_parser: UniversalFileParser,
            header_mapper: HeaderMapper::new(config.header_rules.clone()),
            normalizer: RecordNormalizer::from_config(&config),
            partition_detector: PartitionDetector::from_config(&config),
            dq_validator: DqValidator::from_config(&config),
            conflict_handler: ConflictHandler,
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 从文件预览
    #[instrument(skip(self, options), fields(file = %file_path.display()))]
    pub fn prepare_file(
        &self,
        file_path: &Path,
        options: &PrepareOptions,
    ) -> ImportResult<PreparedImport> {
        debug!("步骤 1: 解析文件");
        let sheets = if options.all_sheets {
            self.file_parser.parse_all_sheets(file_path)?
        } else {
            vec![self.file_parser.parse_first_sheet(file_path)?]
        };
        self.prepare_sheets(sheets, options)
    }

    /// 从工作簿字节流预览
    pub fn prepare_workbook_bytes(
        &self,
        bytes: &[u8],
        options: &PrepareOptions,
    ) -> ImportResult<PreparedImport> {
        debug!("步骤 1: 解析工作簿");
        let sheets = if options.all_sheets {
            ExcelParser.decode_all_sheets(bytes)?
        } else {
            vec![ExcelParser.decode(bytes)?]
        };
        self.prepare_sheets(sheets, options)
    }

    /// 对已解析的工作表执行阶段 2-5
    pub fn prepare_sheets(
        &self,
        sheets: Vec<DecodedSheet>,
        options: &PrepareOptions,
    ) -> ImportResult<PreparedImport> {
        let total_rows: usize = sheets.iter().map(|s| s.rows.len()).sum();
        info!(sheets = sheets.len(), total_rows = total_rows, "文件解析完成");

        // 文件级: 行数上限
        self.dq_validator.validate_row_count(total_rows)?;

        let mut previews = Vec::with_capacity(sheets.len());
        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for sheet in &sheets {
            debug!(sheet = %sheet.sheet_name, "步骤 2: 表头映射");
            let (mapping, warnings) = self.map_with_overrides(&sheet.headers, options);
            for warning in &warnings {
                warn!(sheet = %sheet.sheet_name, warning = ?warning, "表头映射告警");
            }

            // 文件级: 必需字段映射
            self.dq_validator.validate_mapping(&mapping)?;

            let hint = if options.all_sheets {
                self.partition_detector.parse_sheet_partition(&sheet.sheet_name)
            } else {
                PartitionHint::default()
            };

            debug!(sheet = %sheet.sheet_name, "步骤 3: 记录标准化");
            let hint_ref = (!hint.is_empty()).then_some(&hint);
            let sheet_name = options.all_sheets.then_some(sheet.sheet_name.as_str());
            let (sheet_records, sheet_skipped) =
                self.normalizer
                    .normalize_rows(&mapping, &sheet.rows, sheet_name, hint_ref);

            for skip in &sheet_skipped {
                warn!(row_number = skip.row_number, reason = %skip.reason, "行被跳过");
            }

            records.extend(sheet_records);
            skipped.extend(sheet_skipped);
            previews.push(SheetPreview {
                sheet_name: sheet.sheet_name.clone(),
                headers: sheet.headers.clone(),
                mapping,
                warnings,
                hint,
                row_count: sheet.rows.len(),
            });
        }

        debug!("步骤 4: 字段校验与查重");
        let record_issues = self.validate_all(&records);

        debug!("步骤 5: 分区探测");
        let partitions = self.partition_detector.detect(&records);

        let prepared = PreparedImport {
            sheets: previews,
            records,
            record_issues,
            skipped,
            partitions,
        };

        info!(
            records = prepared.records.len(),
            eligible = prepared.eligible_count(),
            invalid = prepared.invalid_count(),
            skipped = prepared.skipped.len(),
            "导入预览完成"
        );

        Ok(prepared)
    }

    fn map_with_overrides(
        &self,
        headers: &[String],
        options: &PrepareOptions,
    ) -> (HeaderMapping, Vec<MappingWarning>) {
        let (mut mapping, mut warnings) = self.header_mapper.map_headers(headers);
        if options.mapping_overrides.is_empty() {
            return (mapping, warnings);
        }

        for (column, field) in &options.mapping_overrides {
            if *column < headers.len() {
                mapping.assign(*column, *field);
            }
        }

        // 覆写后重新计算告警
        warnings.retain(|w| match w {
            MappingWarning::UnmappedHeader { column, .. } => mapping.field_at(*column).is_none(),
            MappingWarning::DuplicateField { .. } => false,
        });
        warnings.extend(crate::importer::header_mapper::duplicate_warnings(&mapping));
        (mapping, warnings)
    }

    fn validate_all(&self, records: &[CanonicalRecord]) -> Vec<ValidationResult> {
        let mut results: Vec<ValidationResult> = records
            .iter()
            .map(|record| self.dq_validator.validate_record(record))
            .collect();

        // 同文件内重复学号（首次出现保留）
        let duplicates = self.conflict_handler.detect_duplicates(records);
        if !duplicates.is_empty() {
            warn!(count = duplicates.len(), "检测到文件内重复学号");
        }
        for (index, roll) in duplicates {
            if let (Some(issues), Some(record)) = (results.get_mut(index), records.get(index)) {
                issues.push(ValidationIssue {
                    row_number: record.row_number,
                    field: Some(CanonicalField::RollNumber),
                    kind: ValidationErrorKind::Duplicate,
                    message: format!("学号 {} 在文件中重复", roll),
                });
            }
        }

        results
    }
}
