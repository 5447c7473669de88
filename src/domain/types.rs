// ==========================================
// 学生批量导入系统 - 领域类型定义
// ==========================================
// 职责: 标准字段、单元格值、校验错误类型、分区维度、运行状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 标准字段 (Canonical Field)
// ==========================================
// 所有输入列最终映射到的管道内部字段标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    SerialNumber,  // 序号（不入库，仅用于识别）
    RollNumber,    // 学号（主标识）
    StudentName,   // 学生姓名（展示名）
    Quota,         // 招生类别
    Gender,        // 性别
    AadhaarNumber, // 身份证号（12 位）
    StudentMobile, // 学生手机
    FatherMobile,  // 父亲手机
    FatherName,    // 父亲姓名
    MotherName,    // 母亲姓名
    Email,         // 联系邮箱
    DateOfBirth,   // 出生日期
    Address,       // 家庭住址
    Department,    // 院系
    Year,          // 年级
    Section,       // 班级
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 16] = [
        CanonicalField::SerialNumber,
        CanonicalField::RollNumber,
        CanonicalField::StudentName,
        CanonicalField::Quota,
        CanonicalField::Gender,
        CanonicalField::AadhaarNumber,
        CanonicalField::StudentMobile,
        CanonicalField::FatherMobile,
        CanonicalField::FatherName,
        CanonicalField::MotherName,
        CanonicalField::Email,
        CanonicalField::DateOfBirth,
        CanonicalField::Address,
        CanonicalField::Department,
        CanonicalField::Year,
        CanonicalField::Section,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::SerialNumber => "serial_number",
            CanonicalField::RollNumber => "roll_number",
            CanonicalField::StudentName => "student_name",
            CanonicalField::Quota => "quota",
            CanonicalField::Gender => "gender",
            CanonicalField::AadhaarNumber => "aadhaar_number",
            CanonicalField::StudentMobile => "student_mobile",
            CanonicalField::FatherMobile => "father_mobile",
            CanonicalField::FatherName => "father_name",
            CanonicalField::MotherName => "mother_name",
            CanonicalField::Email => "email",
            CanonicalField::DateOfBirth => "date_of_birth",
            CanonicalField::Address => "address",
            CanonicalField::Department => "department",
            CanonicalField::Year => "year",
            CanonicalField::Section => "section",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        CanonicalField::ALL.iter().copied().find(|f| f.as_str() == s)
    }

    /// 模板中使用的列标题
    pub fn label(&self) -> &'static str {
        match self {
            CanonicalField::SerialNumber => "S. NO",
            CanonicalField::RollNumber => "Roll. No",
            CanonicalField::StudentName => "Student Name",
            CanonicalField::Quota => "Quota",
            CanonicalField::Gender => "Gender",
            CanonicalField::AadhaarNumber => "Aadhaar",
            CanonicalField::StudentMobile => "Student Mobile",
            CanonicalField::FatherMobile => "Father Mobile",
            CanonicalField::FatherName => "Father Name",
            CanonicalField::MotherName => "Mother Name",
            CanonicalField::Email => "Email",
            CanonicalField::DateOfBirth => "Date of Birth",
            CanonicalField::Address => "Permanent Address",
            CanonicalField::Department => "Department",
            CanonicalField::Year => "Year",
            CanonicalField::Section => "Section",
        }
    }

    /// 是否只保留数字（手机号/身份证号）
    pub fn is_digits_only(&self) -> bool {
        matches!(
            self,
            CanonicalField::StudentMobile
                | CanonicalField::FatherMobile
                | CanonicalField::AadhaarNumber
        )
    }

    /// 对应的分区维度（若该字段承载分区信息）
    pub fn partition_dimension(&self) -> Option<PartitionDimension> {
        match self {
            CanonicalField::Department => Some(PartitionDimension::Department),
            CanonicalField::Year => Some(PartitionDimension::Year),
            CanonicalField::Section => Some(PartitionDimension::Section),
            _ => None,
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 单元格值 (Cell Value)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

impl CellValue {
    /// 空单元格或纯空白文本
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// 转为字符串（整数值不带小数部分）
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            CellValue::Empty => String::new(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

// ==========================================
// 校验错误类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    Required,      // 必填缺失
    InvalidFormat, // 格式错误
    InvalidEnum,   // 不在枚举集合内
    Duplicate,     // 文件内重复
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrorKind::Required => write!(f, "REQUIRED"),
            ValidationErrorKind::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ValidationErrorKind::InvalidEnum => write!(f, "INVALID_ENUM"),
            ValidationErrorKind::Duplicate => write!(f, "DUPLICATE"),
        }
    }
}

// ==========================================
// 分区维度 (Partition Dimension)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionDimension {
    Department, // 院系
    Year,       // 年级
    Section,    // 班级
}

impl PartitionDimension {
    pub fn field(&self) -> CanonicalField {
        match self {
            PartitionDimension::Department => CanonicalField::Department,
            PartitionDimension::Year => CanonicalField::Year,
            PartitionDimension::Section => CanonicalField::Section,
        }
    }
}

impl fmt::Display for PartitionDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionDimension::Department => write!(f, "department"),
            PartitionDimension::Year => write!(f, "year"),
            PartitionDimension::Section => write!(f, "section"),
        }
    }
}

// ==========================================
// 导入运行状态
// ==========================================
// 状态机: Idle → Running → {Completed | Aborted}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn as_str(&self) -> &str {
        match self {
            RunState::Idle => "IDLE",
            RunState::Running => "RUNNING",
            RunState::Completed => "COMPLETED",
            RunState::Aborted => "ABORTED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "IDLE" => RunState::Idle,
            "RUNNING" => RunState::Running,
            "COMPLETED" => RunState::Completed,
            _ => RunState::Aborted,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
