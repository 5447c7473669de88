// ==========================================
// 学生批量导入系统 - 学生导入领域模型
// ==========================================
// 职责: 原始行 / 表头映射 / 标准记录 / 校验结果 / 分区键 / 档案文档
// 红线: 不含数据访问逻辑
// ==========================================

use crate::domain::types::{CanonicalField, CellValue, PartitionDimension, ValidationErrorKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// RawRow - 原始行
// ==========================================
// 生命周期: 由解析器产生，被标准化器消费
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub row_number: usize,     // 工作表中的行号（表头为第 1 行）
    pub cells: Vec<CellValue>, // 与表头按位置对齐
}

impl RawRow {
    pub fn new(row_number: usize, cells: Vec<CellValue>) -> Self {
        Self { row_number, cells }
    }

    pub fn cell(&self, column: usize) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_blank)
    }
}

// ==========================================
// DecodedSheet - 解析后的单个工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSheet {
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

// ==========================================
// HeaderMapping - 列序号 → 标准字段
// ==========================================
// 每个上传文件构建一次；执行开始后不再变化
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMapping {
    columns: BTreeMap<usize, CanonicalField>,
}

impl HeaderMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定（或清除）某列的映射，供操作员手工覆写
    pub fn assign(&mut self, column: usize, field: Option<CanonicalField>) {
        match field {
            Some(f) => {
                self.columns.insert(column, f);
            }
            None => {
                self.columns.remove(&column);
            }
        }
    }

    pub fn field_at(&self, column: usize) -> Option<CanonicalField> {
        self.columns.get(&column).copied()
    }

    /// 映射到该字段的所有列（升序）
    pub fn columns_of(&self, field: CanonicalField) -> Vec<usize> {
        self.columns
            .iter()
            .filter(|(_, f)| **f == field)
            .map(|(c, _)| *c)
            .collect()
    }

    /// 读取该字段时使用的列（多列映射时后者覆盖前者）
    pub fn column_of(&self, field: CanonicalField) -> Option<usize> {
        self.columns_of(field).last().copied()
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.columns.values().any(|f| *f == field)
    }

    /// 字段 → 实际读取列
    pub fn resolved(&self) -> BTreeMap<CanonicalField, usize> {
        let mut resolved = BTreeMap::new();
        for (column, field) in &self.columns {
            resolved.insert(*field, *column);
        }
        resolved
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, CanonicalField)> + '_ {
        self.columns.iter().map(|(c, f)| (*c, *f))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ==========================================
// MappingWarning - 表头映射告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingWarning {
    /// 多列映射到同一字段（读取时以 kept 列为准）
    DuplicateField {
        field: CanonicalField,
        columns: Vec<usize>,
        kept: usize,
    },
    /// 表头未匹配任何字段
    UnmappedHeader { column: usize, header: String },
}

// ==========================================
// CanonicalRecord - 标准记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub row_number: usize,                         // 原始行号
    pub sheet_name: Option<String>,                // 来源工作表
    pub values: BTreeMap<CanonicalField, String>,  // 仅保存非空值
    pub login_identifier: String,                  // 登录账号（派生）
    pub initial_secret: String,                    // 初始密码（派生）
}

impl CanonicalRecord {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.values.get(&field).map(|v| v.as_str())
    }

    pub fn roll_number(&self) -> &str {
        self.get(CanonicalField::RollNumber).unwrap_or("")
    }

    pub fn student_name(&self) -> &str {
        self.get(CanonicalField::StudentName).unwrap_or("")
    }

    pub fn partition_value(&self, dimension: PartitionDimension) -> Option<&str> {
        self.get(dimension.field())
    }
}

// ==========================================
// SkippedRow - 标准化阶段被拒绝的行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub row_number: usize,
    pub sheet_name: Option<String>,
    pub reason: String,
}

// ==========================================
// ValidationIssue - 字段级校验问题
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub row_number: usize,
    pub field: Option<CanonicalField>,
    pub kind: ValidationErrorKind,
    pub message: String,
}

/// 单条记录的校验结果（空 = 可导入）
pub type ValidationResult = Vec<ValidationIssue>;

// ==========================================
// PartitionHint - 部分分区信息（来自工作表名或操作员）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionHint {
    pub department: Option<String>,
    pub year: Option<String>,
    pub section: Option<String>,
}

impl PartitionHint {
    pub fn get(&self, dimension: PartitionDimension) -> Option<&str> {
        match dimension {
            PartitionDimension::Department => self.department.as_deref(),
            PartitionDimension::Year => self.year.as_deref(),
            PartitionDimension::Section => self.section.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.department.is_none() && self.year.is_none() && self.section.is_none()
    }
}

// ==========================================
// PartitionKey - 落库分组键
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub department: String,
    pub year: String,
    pub section: String,
}

impl PartitionKey {
    pub fn new(
        department: impl Into<String>,
        year: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        Self {
            department: department.into(),
            year: year.into(),
            section: section.into(),
        }
    }

    /// 年级-班级，例如 "III-A"
    pub fn group_key(&self) -> String {
        format!("{}-{}", sanitize_segment(&self.year), sanitize_segment(&self.section))
    }

    /// 档案集合路径，例如 "students/CSE/III-A"
    pub fn collection_path(&self) -> String {
        format!("students/{}/{}", sanitize_segment(&self.department), self.group_key())
    }

    pub fn get(&self, dimension: PartitionDimension) -> &str {
        match dimension {
            PartitionDimension::Department => &self.department,
            PartitionDimension::Year => &self.year,
            PartitionDimension::Section => &self.section,
        }
    }
}

// ==========================================
// PartitionStrategy - 执行前由操作员确认的分区方式
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// 全部记录使用同一分区键（忽略记录中的分区值）
    Uniform { key: PartitionKey },
    /// 按记录自身的分区值，缺失维度用 fallback 补齐
    PerRecord { fallback: PartitionHint },
}

impl PartitionStrategy {
    /// 解析记录的分区键；任一维度缺失时返回 None
    pub fn resolve(&self, record: &CanonicalRecord) -> Option<PartitionKey> {
        match self {
            PartitionStrategy::Uniform { key } => Some(key.clone()),
            PartitionStrategy::PerRecord { fallback } => {
                let pick = |dimension: PartitionDimension| {
                    record
                        .partition_value(dimension)
                        .or_else(|| fallback.get(dimension))
                        .filter(|v| !v.is_empty())
                        .map(|v| v.to_string())
                };
                Some(PartitionKey {
                    department: pick(PartitionDimension::Department)?,
                    year: pick(PartitionDimension::Year)?,
                    section: pick(PartitionDimension::Section)?,
                })
            }
        }
    }
}

/// 路径片段只保留字母/数字/下划线
fn sanitize_segment(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

// ==========================================
// StudentProfile - 落库档案文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    // 文档定位
    pub document_id: String,   // 账号 uid，缺失时为学号
    pub document_path: String, // collection_path/document_id
    pub run_id: String,
    pub row_number: usize,

    // 标准字段
    pub roll_number: String,
    pub student_name: String,
    pub fields: BTreeMap<CanonicalField, String>,

    // 分区
    pub partition: PartitionKey,
    pub department_code: String,
    pub year_section: String,

    // 账号信息（开通失败时为空）
    pub login_identifier: String,
    pub auth_uid: Option<String>,

    // 检索/展示字段
    pub searchable_name: String,
    pub searchable_roll_number: String,
    pub display_name: String,
    pub short_name: String,
    pub initials: String,

    // 元信息
    pub status: String,
    pub import_source: String,
    pub imported_at: DateTime<Utc>,
}

// ==========================================
// BatchCommit - 一次批量提交的结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCommit {
    pub committed: usize,
}
