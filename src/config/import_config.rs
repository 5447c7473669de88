// ==========================================
// 学生批量导入系统 - 导入配置值
// ==========================================
// 职责: 表头匹配规则表 / 字段校验规则表 / 分区允许值 / 执行参数
// 说明: 以显式值传入各阶段，不依赖全局状态
// ==========================================

use crate::domain::types::{CanonicalField, PartitionDimension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// 表头匹配规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HeaderMatcher {
    /// 规范化后的表头与之完全相等
    Exact(String),
    /// 规范化后的表头包含该子串
    Contains(String),
    /// 同时包含全部子串
    ContainsAll(Vec<String>),
}

impl HeaderMatcher {
    /// `header` 需已规范化（小写、去首尾空白、内部空白折叠）
    pub fn matches(&self, header: &str) -> bool {
        match self {
            HeaderMatcher::Exact(s) => header == s,
            HeaderMatcher::Contains(s) => header.contains(s.as_str()),
            HeaderMatcher::ContainsAll(parts) => {
                !parts.is_empty() && parts.iter().all(|p| header.contains(p.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRule {
    pub field: CanonicalField,
    pub matchers: Vec<HeaderMatcher>,
}

impl HeaderRule {
    pub fn matches(&self, header: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(header))
    }
}

fn exact(s: &str) -> HeaderMatcher {
    HeaderMatcher::Exact(s.to_string())
}

fn contains(s: &str) -> HeaderMatcher {
    HeaderMatcher::Contains(s.to_string())
}

fn contains_all(parts: &[&str]) -> HeaderMatcher {
    HeaderMatcher::ContainsAll(parts.iter().map(|p| p.to_string()).collect())
}

/// 默认表头规则（顺序即优先级，先匹配者胜出）
pub fn default_header_rules() -> Vec<HeaderRule> {
    use CanonicalField::*;
    vec![
        HeaderRule {
            field: SerialNumber,
            matchers: vec![
                exact("s. no"),
                exact("s.no"),
                exact("s no"),
                exact("sno"),
                exact("sl. no"),
                exact("sl.no"),
                exact("sl no"),
                exact("serial no"),
                exact("#"),
            ],
        },
        HeaderRule {
            field: FatherMobile,
            matchers: vec![
                contains_all(&["father", "mobile"]),
                contains_all(&["father", "phone"]),
                contains_all(&["father", "contact"]),
                contains("parent mobile"),
                contains("parent phone"),
            ],
        },
        HeaderRule {
            field: MotherName,
            matchers: vec![contains("mother")],
        },
        HeaderRule {
            field: FatherName,
            matchers: vec![contains("father"), contains("guardian")],
        },
        HeaderRule {
            field: Email,
            matchers: vec![contains("email"), contains("e-mail"), contains("mail id")],
        },
        HeaderRule {
            field: Address,
            matchers: vec![contains("address")],
        },
        HeaderRule {
            field: StudentMobile,
            matchers: vec![
                contains("student mobile"),
                contains("mobile"),
                contains("phone"),
                contains("contact"),
            ],
        },
        HeaderRule {
            field: Quota,
            matchers: vec![contains("quota"), contains("category")],
        },
        HeaderRule {
            field: Department,
            matchers: vec![contains("department"), contains("dept"), contains("branch")],
        },
        HeaderRule {
            field: Year,
            matchers: vec![contains("year")],
        },
        HeaderRule {
            field: Section,
            matchers: vec![contains("section"), exact("sec"), exact("div"), contains("division")],
        },
        HeaderRule {
            field: Gender,
            matchers: vec![contains("gender"), exact("sex")],
        },
        HeaderRule {
            field: AadhaarNumber,
            matchers: vec![contains("aadhaar"), contains("aadhar")],
        },
        HeaderRule {
            field: DateOfBirth,
            matchers: vec![contains("dob"), contains("date of birth"), contains("birth")],
        },
        HeaderRule {
            field: RollNumber,
            matchers: vec![
                contains("roll"),
                contains_all(&["admission", "no"]),
                contains_all(&["admission", "number"]),
                exact("admission"),
                contains("regd"),
                contains("reg no"),
                contains("reg. no"),
                contains("registration"),
                contains("hall ticket"),
                contains("htno"),
            ],
        },
        HeaderRule {
            field: StudentName,
            matchers: vec![
                contains("student name"),
                contains("studentname"),
                contains("name"),
            ],
        },
    ]
}

// ==========================================
// 字段校验规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum FieldClass {
    /// 仅字母数字
    Identifier,
    /// 任意文本
    Text,
    /// 去除非数字后位数在 [min_digits, max_digits]
    Phone { min_digits: usize, max_digits: usize },
    /// 恰好 digits 位数字
    NationalId { digits: usize },
    /// 封闭集合（大小写不敏感）
    Enumerated { values: Vec<String> },
    /// local@domain.tld
    Email,
    /// YYYY-MM-DD
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: CanonicalField,
    pub required: bool,
    #[serde(flatten)]
    pub class: FieldClass,
}

pub const DEFAULT_GENDERS: [&str; 3] = ["Male", "Female", "Other"];
pub const DEFAULT_QUOTAS: [&str; 4] = ["CC", "MG", "COV", "MGMT"];

/// 默认字段校验规则
pub fn default_field_rules() -> Vec<FieldRule> {
    use CanonicalField::*;
    let phone = FieldClass::Phone {
        min_digits: 10,
        max_digits: 11,
    };
    vec![
        FieldRule {
            field: RollNumber,
            required: true,
            class: FieldClass::Identifier,
        },
        FieldRule {
            field: StudentName,
            required: true,
            class: FieldClass::Text,
        },
        FieldRule {
            field: StudentMobile,
            required: false,
            class: phone.clone(),
        },
        FieldRule {
            field: FatherMobile,
            required: false,
            class: phone,
        },
        FieldRule {
            field: AadhaarNumber,
            required: false,
            class: FieldClass::NationalId { digits: 12 },
        },
        FieldRule {
            field: Gender,
            required: false,
            class: FieldClass::Enumerated {
                values: DEFAULT_GENDERS.iter().map(|s| s.to_string()).collect(),
            },
        },
        FieldRule {
            field: Quota,
            required: false,
            class: FieldClass::Enumerated {
                values: DEFAULT_QUOTAS.iter().map(|s| s.to_string()).collect(),
            },
        },
        FieldRule {
            field: Email,
            required: false,
            class: FieldClass::Email,
        },
        FieldRule {
            field: DateOfBirth,
            required: false,
            class: FieldClass::Date,
        },
    ]
}

// ==========================================
// 院系选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentOption {
    pub code: String,
    pub label: String,
}

pub fn default_departments() -> Vec<DepartmentOption> {
    [
        ("CSE", "Computer Science & Engineering"),
        ("CSE_AI", "CSE (Artificial Intelligence)"),
        ("CSE_CS", "CSE (Cyber Security)"),
        ("CSE_DS", "CSE (Data Science)"),
        ("CSE_AI_ML", "CSE (AI & Machine Learning)"),
        ("CSE_NETWORKS", "CSE (Networks)"),
        ("CST", "Computer Science & Technology"),
        ("ECE", "Electronics & Communication Engineering"),
        ("EEE", "Electrical & Electronics Engineering"),
        ("MECH", "Mechanical Engineering"),
        ("CIVIL", "Civil Engineering"),
        ("IT", "Information Technology"),
        ("BSH", "Basic Sciences & Humanities"),
        ("MS", "Management Studies"),
        ("MCA", "Master of Computer Applications"),
    ]
    .iter()
    .map(|(code, label)| DepartmentOption {
        code: code.to_string(),
        label: label.to_string(),
    })
    .collect()
}

// ==========================================
// 初始密码策略
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SecretPolicy {
    /// <字母数字学号><suffix>
    Derived { suffix: String },
    /// 固定值
    Fixed { value: String },
}

impl Default for SecretPolicy {
    fn default() -> Self {
        SecretPolicy::Derived {
            suffix: "@123".to_string(),
        }
    }
}

// ==========================================
// ImportConfig - 导入配置（各阶段共享的显式配置值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    // 映射与校验
    pub header_rules: Vec<HeaderRule>,
    pub field_rules: Vec<FieldRule>,

    // 分区
    pub partition_allowed: BTreeMap<PartitionDimension, Vec<String>>,
    pub departments: Vec<DepartmentOption>,

    // 账号派生
    pub login_suffix: String,
    pub secret_policy: SecretPolicy,

    // 执行参数
    pub flush_batch_size: usize,
    pub throttle_ms: u64,
    pub commit_retry_limit: u32,
    pub retry_backoff_ms: u64,
    pub identity_timeout_ms: u64,
    pub max_rows_per_import: usize,
}

pub const DEFAULT_LOGIN_SUFFIX: &str = "@mits.ac.in";
pub const DEFAULT_FLUSH_BATCH_SIZE: usize = 50;
pub const DEFAULT_THROTTLE_MS: u64 = 100;
pub const DEFAULT_COMMIT_RETRY_LIMIT: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
pub const DEFAULT_IDENTITY_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAX_ROWS_PER_IMPORT: usize = 1000;

impl Default for ImportConfig {
    fn default() -> Self {
        let departments = default_departments();

        let mut partition_allowed = BTreeMap::new();
        partition_allowed.insert(
            PartitionDimension::Department,
            departments.iter().map(|d| d.code.clone()).collect(),
        );
        partition_allowed.insert(
            PartitionDimension::Year,
            ["I", "II", "III", "IV"].iter().map(|s| s.to_string()).collect(),
        );
        partition_allowed.insert(
            PartitionDimension::Section,
            ["A", "B", "C", "D", "E", "F"].iter().map(|s| s.to_string()).collect(),
        );

        Self {
            header_rules: default_header_rules(),
            field_rules: default_field_rules(),
            partition_allowed,
            departments,
            login_suffix: DEFAULT_LOGIN_SUFFIX.to_string(),
            secret_policy: SecretPolicy::default(),
            flush_batch_size: DEFAULT_FLUSH_BATCH_SIZE,
            throttle_ms: DEFAULT_THROTTLE_MS,
            commit_retry_limit: DEFAULT_COMMIT_RETRY_LIMIT,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            identity_timeout_ms: DEFAULT_IDENTITY_TIMEOUT_MS,
            max_rows_per_import: DEFAULT_MAX_ROWS_PER_IMPORT,
        }
    }
}

impl ImportConfig {
    pub fn department_label(&self, code: &str) -> Option<&str> {
        self.departments
            .iter()
            .find(|d| d.code.eq_ignore_ascii_case(code))
            .map(|d| d.label.as_str())
    }
}
