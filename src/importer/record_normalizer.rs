// ==========================================
// 学生批量导入系统 - 记录标准化器实现
// ==========================================
// 职责: RawRow + HeaderMapping → CanonicalRecord
// 唯一硬失败: 学号或姓名为空 → SkippedRow
// ==========================================

use crate::config::import_config::{DepartmentOption, ImportConfig};
use crate::domain::student::{CanonicalRecord, HeaderMapping, PartitionHint, RawRow, SkippedRow};
use crate::domain::types::{CanonicalField, PartitionDimension};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::derivation::DerivationService;
use crate::importer::import_trait::{
    DataCleaner as DataCleanerTrait, DerivationService as DerivationServiceTrait,
    RecordNormalizer as RecordNormalizerTrait,
};
use std::collections::BTreeMap;

pub struct RecordNormalizer {
    cleaner: DataCleaner,
    derivation: DerivationService,
    departments: Vec<DepartmentOption>,
}

impl RecordNormalizer {
    pub fn new(derivation: DerivationService, departments: Vec<DepartmentOption>) -> Self {
        Self {
            cleaner: DataCleaner,
            derivation,
            departments,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            DerivationService::from_config(config),
            config.departments.clone(),
        )
    }

    // 院系按院系表解析为代码，其余字段走通用清洗
    fn clean_value(&self, field: CanonicalField, raw: &str) -> Option<String> {
        match field {
            CanonicalField::Department => self.cleaner.resolve_department(raw, &self.departments),
            _ => self.cleaner.clean_field(field, raw),
        }
    }

    /// 标准化整张表的数据行（保持文件顺序）
    pub fn normalize_rows(
        &self,
        mapping: &HeaderMapping,
        rows: &[RawRow],
        sheet_name: Option<&str>,
        hint: Option<&PartitionHint>,
    ) -> (Vec<CanonicalRecord>, Vec<SkippedRow>) {
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for row in rows {
            match self.normalize(mapping, row, hint) {
                Ok(mut record) => {
                    record.sheet_name = sheet_name.map(|s| s.to_string());
                    records.push(record);
                }
                Err(mut skip) => {
                    skip.sheet_name = sheet_name.map(|s| s.to_string());
                    skipped.push(skip);
                }
            }
        }

        (records, skipped)
    }
}

impl RecordNormalizerTrait for RecordNormalizer {
    fn normalize(
        &self,
        mapping: &HeaderMapping,
        row: &RawRow,
        hint: Option<&PartitionHint>,
    ) -> Result<CanonicalRecord, SkippedRow> {
        let mut values: BTreeMap<CanonicalField, String> = BTreeMap::new();

        // 多列映射同一字段时以最后一列为准
        for (field, column) in mapping.resolved() {
            let raw = row.cell(column).to_text();
            if let Some(value) = self.clean_value(field, &raw) {
                values.insert(field, value);
            }
        }

        // 分区提示回填空值
        if let Some(hint) = hint {
            for dimension in [
                PartitionDimension::Department,
                PartitionDimension::Year,
                PartitionDimension::Section,
            ] {
                let field = dimension.field();
                if values.contains_key(&field) {
                    continue;
                }
                if let Some(value) = hint
                    .get(dimension)
                    .and_then(|v| self.clean_value(field, v))
                {
                    values.insert(field, value);
                }
            }
        }

        let roll_number = values.get(&CanonicalField::RollNumber).cloned();
        let has_name = values.contains_key(&CanonicalField::StudentName);

        let roll_number = match (roll_number, has_name) {
            (Some(roll), true) => roll,
            (roll, _) => {
                let reason = if roll.is_none() {
                    "学号为空"
                } else {
                    "学生姓名为空"
                };
                return Err(SkippedRow {
                    row_number: row.row_number,
                    sheet_name: None,
                    reason: reason.to_string(),
                });
            }
        };

        Ok(CanonicalRecord {
            row_number: row.row_number,
            sheet_name: None,
            login_identifier: self.derivation.derive_login_identifier(&roll_number),
            initial_secret: self.derivation.derive_initial_secret(&roll_number),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CellValue;

    fn mapping(fields: &[CanonicalField]) -> HeaderMapping {
        let mut m = HeaderMapping::new();
        for (i, f) in fields.iter().enumerate() {
            m.assign(i, Some(*f));
        }
        m
    }

    fn row(row_number: usize, cells: &[&str]) -> RawRow {
        RawRow::new(row_number, cells.iter().map(|c| CellValue::from(*c)).collect())
    }

    #[test]
    fn test_normalize_basic_record() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[
            CanonicalField::RollNumber,
            CanonicalField::StudentName,
            CanonicalField::StudentMobile,
        ]);

        let record = normalizer
            .normalize(&m, &row(2, &[" A100 ", "Jane   Doe", "987-654-3210"]), None)
            .unwrap();

        assert_eq!(record.roll_number(), "A100");
        assert_eq!(record.student_name(), "Jane Doe");
        assert_eq!(record.get(CanonicalField::StudentMobile), Some("9876543210"));
        assert_eq!(record.login_identifier, "a100@mits.ac.in");
        assert_eq!(record.initial_secret, "A100@123");
    }

    #[test]
    fn test_missing_roll_or_name_is_skipped() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[CanonicalField::RollNumber, CanonicalField::StudentName]);

        let skipped = normalizer.normalize(&m, &row(3, &["  ", "Jane"]), None).unwrap_err();
        assert_eq!(skipped.row_number, 3);
        assert_eq!(skipped.reason, "学号为空");

        let skipped = normalizer.normalize(&m, &row(4, &["A1", ""]), None).unwrap_err();
        assert_eq!(skipped.reason, "学生姓名为空");
    }

    #[test]
    fn test_numeric_cells_and_partition_cleaning() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[
            CanonicalField::RollNumber,
            CanonicalField::StudentName,
            CanonicalField::Year,
            CanonicalField::Section,
            CanonicalField::DateOfBirth,
        ]);
        let raw = RawRow::new(
            5,
            vec![
                CellValue::Number(1234.0),
                CellValue::Text("Ravi".to_string()),
                CellValue::Text("3rd Year".to_string()),
                CellValue::Text("b".to_string()),
                CellValue::Number(36892.0),
            ],
        );

        let record = normalizer.normalize(&m, &raw, None).unwrap();
        assert_eq!(record.roll_number(), "1234");
        assert_eq!(record.get(CanonicalField::Year), Some("III"));
        assert_eq!(record.get(CanonicalField::Section), Some("B"));
        assert_eq!(record.get(CanonicalField::DateOfBirth), Some("2001-01-01"));
    }

    #[test]
    fn test_hint_backfills_only_empty_partition_fields() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[
            CanonicalField::RollNumber,
            CanonicalField::StudentName,
            CanonicalField::Year,
            CanonicalField::Section,
        ]);
        let hint = PartitionHint {
            department: Some("cse".to_string()),
            year: Some("2".to_string()),
            section: Some("C".to_string()),
        };

        let record = normalizer
            .normalize(&m, &row(2, &["A1", "Jane", "-", "A"]), Some(&hint))
            .unwrap();

        assert_eq!(record.get(CanonicalField::Department), Some("CSE"));
        assert_eq!(record.get(CanonicalField::Year), Some("II"));
        assert_eq!(record.get(CanonicalField::Section), Some("A"));
    }

    #[test]
    fn test_duplicate_column_last_wins() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[
            CanonicalField::RollNumber,
            CanonicalField::StudentName,
            CanonicalField::StudentMobile,
            CanonicalField::StudentMobile,
        ]);
        let record = normalizer
            .normalize(&m, &row(2, &["A1", "Jane", "1111111111", "2222222222"]), None)
            .unwrap();
        assert_eq!(record.get(CanonicalField::StudentMobile), Some("2222222222"));
    }

    #[test]
    fn test_department_label_resolves_to_code() {
        let normalizer = RecordNormalizer::from_config(&ImportConfig::default());
        let m = mapping(&[
            CanonicalField::RollNumber,
            CanonicalField::StudentName,
            CanonicalField::Department,
        ]);

        let by_label = normalizer
            .normalize(
                &m,
                &row(2, &["A100", "Jane", "Computer Science & Engineering"]),
                None,
            )
            .unwrap();
        assert_eq!(by_label.get(CanonicalField::Department), Some("CSE"));

        let by_code = normalizer
            .normalize(&m, &row(3, &["A101", "John", "ece"]), None)
            .unwrap();
        assert_eq!(by_code.get(CanonicalField::Department), Some("ECE"));
    }
}
