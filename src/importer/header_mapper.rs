// ==========================================
// 学生批量导入系统 - 表头映射器实现
// ==========================================
// 职责: 表头文本 → 标准字段（有序规则表，先匹配者胜出）
// 约束: 幂等、无副作用
// ==========================================

use crate::config::import_config::{default_header_rules, HeaderRule};
use crate::domain::student::{HeaderMapping, MappingWarning};
use crate::domain::types::CanonicalField;
use crate::importer::import_trait::HeaderMapper as HeaderMapperTrait;
use std::collections::BTreeMap;

pub struct HeaderMapper {
    rules: Vec<HeaderRule>,
}

impl HeaderMapper {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// 匹配单个表头（返回第一个命中的规则字段）
    pub fn match_header(&self, header: &str) -> Option<CanonicalField> {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|rule| rule.matches(&normalized))
            .map(|rule| rule.field)
    }
}

impl Default for HeaderMapper {
    fn default() -> Self {
        Self::new(default_header_rules())
    }
}

impl HeaderMapperTrait for HeaderMapper {
    fn map_headers(&self, headers: &[String]) -> (HeaderMapping, Vec<MappingWarning>) {
        let mut mapping = HeaderMapping::new();
        let mut warnings = Vec::new();

        for (column, header) in headers.iter().enumerate() {
            match self.match_header(header) {
                Some(field) => mapping.assign(column, Some(field)),
                None => {
                    // 空表头列不报告
                    if !header.trim().is_empty() {
                        warnings.push(MappingWarning::UnmappedHeader {
                            column,
                            header: header.clone(),
                        });
                    }
                }
            }
        }

        warnings.extend(duplicate_warnings(&mapping));
        (mapping, warnings)
    }
}

/// 多列映射到同一字段时的告警（以最后一列为准）
pub fn duplicate_warnings(mapping: &HeaderMapping) -> Vec<MappingWarning> {
    let mut by_field: BTreeMap<CanonicalField, Vec<usize>> = BTreeMap::new();
    for (column, field) in mapping.iter() {
        by_field.entry(field).or_default().push(column);
    }

    by_field
        .into_iter()
        .filter(|(_, columns)| columns.len() > 1)
        .filter_map(|(field, columns)| {
            let kept = *columns.last()?;
            Some(MappingWarning::DuplicateField {
                field,
                columns,
                kept,
            })
        })
        .collect()
}

/// 小写 + 去首尾空白 + 内部空白折叠
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
