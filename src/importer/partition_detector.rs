// ==========================================
// 学生批量导入系统 - 分区探测器实现
// ==========================================
// 职责: 统计记录中出现的 院系/年级/班级 取值（信息性，不会失败）
// 附加: 从工作表名解析分区提示（"III A" / "II-B" / "4th Year" / "C"）
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::domain::student::{CanonicalRecord, PartitionHint};
use crate::domain::types::PartitionDimension;
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::import_trait::{
    DataCleaner as DataCleanerTrait, PartitionDetector as PartitionDetectorTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const DIMENSIONS: [PartitionDimension; 3] = [
    PartitionDimension::Department,
    PartitionDimension::Year,
    PartitionDimension::Section,
];

// ==========================================
// PartitionSummary - 探测结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub values: Vec<String>,     // 去重 + 排序
    pub unexpected: Vec<String>, // 不在允许集合内的值
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub dimensions: BTreeMap<PartitionDimension, DimensionSummary>,
}

impl PartitionSummary {
    pub fn values(&self, dimension: PartitionDimension) -> &[String] {
        self.dimensions
            .get(&dimension)
            .map(|d| d.values.as_slice())
            .unwrap_or(&[])
    }

    pub fn unexpected(&self, dimension: PartitionDimension) -> &[String] {
        self.dimensions
            .get(&dimension)
            .map(|d| d.unexpected.as_slice())
            .unwrap_or(&[])
    }

    /// 每个维度取第一个探测值作为默认选择
    pub fn suggest_default(&self) -> PartitionHint {
        let first = |d| self.values(d).first().cloned();
        PartitionHint {
            department: first(PartitionDimension::Department),
            year: first(PartitionDimension::Year),
            section: first(PartitionDimension::Section),
        }
    }

    pub fn has_unexpected(&self) -> bool {
        self.dimensions.values().any(|d| !d.unexpected.is_empty())
    }
}

// ==========================================
// PartitionDetector
// ==========================================
pub struct PartitionDetector {
    allowed: BTreeMap<PartitionDimension, Vec<String>>,
    department_codes: Vec<String>,
    cleaner: DataCleaner,
}

impl PartitionDetector {
    pub fn new(
        allowed: BTreeMap<PartitionDimension, Vec<String>>,
        department_codes: Vec<String>,
    ) -> Self {
        Self {
            allowed,
            department_codes,
            cleaner: DataCleaner,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            config.partition_allowed.clone(),
            config.departments.iter().map(|d| d.code.clone()).collect(),
        )
    }

    /// 从工作表名解析分区提示
    ///
    /// # 示例
    /// - "III A" → year=III, section=A
    /// - "II-B" → year=II, section=B
    /// - "4th Year" → year=IV
    /// - "C" → section=C
    /// - "CSE II A" → department=CSE, year=II, section=A
    pub fn parse_sheet_partition(&self, sheet_name: &str) -> PartitionHint {
        let tokens: Vec<&str> = sheet_name
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|t| !t.is_empty())
            .filter(|t| {
                !matches!(
                    t.to_lowercase().as_str(),
                    "year" | "yr" | "section" | "sec" | "sem" | "semester"
                )
            })
            .collect();

        let mut hint = PartitionHint::default();
        let count = tokens.len();

        for (idx, token) in tokens.iter().enumerate() {
            let upper = token.to_uppercase();
            let is_single_letter =
                token.chars().count() == 1 && token.chars().all(|c| c.is_ascii_alphabetic());

            if hint.department.is_none() && self.department_codes.contains(&upper) {
                hint.department = Some(upper);
                continue;
            }

            if is_single_letter {
                let roman = self.cleaner.to_roman_year(token);
                let more_follow = idx + 1 < count;
                if hint.year.is_none() && roman.is_some() && (more_follow || count == 1) {
                    hint.year = roman;
                } else if hint.section.is_none() {
                    hint.section = Some(upper);
                }
                continue;
            }

            if hint.year.is_none() {
                if let Some(roman) = self.cleaner.to_roman_year(token) {
                    hint.year = Some(roman);
                }
            }
        }

        hint
    }
}

impl PartitionDetectorTrait for PartitionDetector {
    fn detect(&self, records: &[CanonicalRecord]) -> PartitionSummary {
        let mut summary = PartitionSummary::default();

        for dimension in DIMENSIONS {
            let values: BTreeSet<String> = records
                .iter()
                .filter_map(|r| r.partition_value(dimension))
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
                .collect();

            let allowed = self.allowed.get(&dimension);
            let unexpected = values
                .iter()
                .filter(|v| match allowed {
                    Some(list) if !list.is_empty() => !list.contains(v),
                    _ => false,
                })
                .cloned()
                .collect();

            summary.dimensions.insert(
                dimension,
                DimensionSummary {
                    values: values.into_iter().collect(),
                    unexpected,
                },
            );
        }

        summary
    }
}

/// 年级罗马化（供外部调用）
pub fn to_roman_year(value: &str) -> Option<String> {
    DataCleaner.to_roman_year(value)
}
