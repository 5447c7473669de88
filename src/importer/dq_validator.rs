// ==========================================
// 学生批量导入系统 - 数据质量校验器实现
// ==========================================
// 职责: 文件级（必需字段映射 / 行数上限）+ 记录级（字段规则）校验
// 说明: 可选字段仅在非空时校验
// ==========================================

use crate::config::import_config::{FieldClass, FieldRule, ImportConfig};
use crate::domain::student::{CanonicalRecord, HeaderMapping, ValidationIssue, ValidationResult};
use crate::domain::types::{CanonicalField, ValidationErrorKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::DqValidator as DqValidatorTrait;
use chrono::NaiveDate;

/// 文件级必需映射的字段
pub const REQUIRED_MAPPED_FIELDS: [CanonicalField; 2] =
    [CanonicalField::RollNumber, CanonicalField::StudentName];

pub struct DqValidator {
    rules: Vec<FieldRule>,
    max_rows: usize, // 单次导入最大数据行数
}

impl DqValidator {
    pub fn new(rules: Vec<FieldRule>, max_rows: usize) -> Self {
        Self { rules, max_rows }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.field_rules.clone(), config.max_rows_per_import)
    }

    fn check_rule(&self, rule: &FieldRule, record: &CanonicalRecord) -> Option<ValidationIssue> {
        let issue = |kind, message: String| ValidationIssue {
            row_number: record.row_number,
            field: Some(rule.field),
            kind,
            message,
        };

        let value = match record.get(rule.field) {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                return rule.required.then(|| {
                    issue(
                        ValidationErrorKind::Required,
                        format!("{} 为必填字段", rule.field),
                    )
                });
            }
        };

        match &rule.class {
            FieldClass::Text => None,
            FieldClass::Identifier => {
                if value.chars().all(|c| c.is_ascii_alphanumeric()) {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidFormat,
                        format!("{} 只能包含字母和数字: {}", rule.field, value),
                    ))
                }
            }
            FieldClass::Phone {
                min_digits,
                max_digits,
            } => {
                let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
                let all_digits = value.chars().all(|c| c.is_ascii_digit());
                if all_digits && digits >= *min_digits && digits <= *max_digits {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidFormat,
                        format!(
                            "{} 应为 {}-{} 位数字: {}",
                            rule.field, min_digits, max_digits, value
                        ),
                    ))
                }
            }
            FieldClass::NationalId { digits } => {
                if value.len() == *digits && value.chars().all(|c| c.is_ascii_digit()) {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidFormat,
                        format!("{} 应为 {} 位数字: {}", rule.field, digits, value),
                    ))
                }
            }
            FieldClass::Enumerated { values } => {
                if values.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidEnum,
                        format!(
                            "{} 取值 {} 不在 [{}] 中",
                            rule.field,
                            value,
                            values.join(", ")
                        ),
                    ))
                }
            }
            FieldClass::Email => {
                if is_email_shape(value) {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidFormat,
                        format!("{} 邮箱格式错误: {}", rule.field, value),
                    ))
                }
            }
            FieldClass::Date => {
                if value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok() {
                    None
                } else {
                    Some(issue(
                        ValidationErrorKind::InvalidFormat,
                        format!("{} 日期格式错误（期望 YYYY-MM-DD）: {}", rule.field, value),
                    ))
                }
            }
        }
    }
}

impl DqValidatorTrait for DqValidator {
    fn validate_mapping(&self, mapping: &HeaderMapping) -> ImportResult<()> {
        let missing: Vec<CanonicalField> = REQUIRED_MAPPED_FIELDS
            .iter()
            .copied()
            .filter(|f| !mapping.is_mapped(*f))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MappingIncomplete { missing })
        }
    }

    fn validate_row_count(&self, rows: usize) -> ImportResult<()> {
        if rows > self.max_rows {
            Err(ImportError::TooManyRows {
                rows,
                max: self.max_rows,
            })
        } else {
            Ok(())
        }
    }

    fn validate_record(&self, record: &CanonicalRecord) -> ValidationResult {
        self.rules
            .iter()
            .filter_map(|rule| self.check_rule(rule, record))
            .collect()
    }
}

/// local@domain.tld
fn is_email_shape(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(d), None) => (l, d),
        _ => return false,
    };
    if local.is_empty() {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}
