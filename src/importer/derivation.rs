// ==========================================
// 学生批量导入系统 - 字段派生服务实现
// ==========================================
// 职责: 登录账号 / 初始密码 / 检索与展示字段 / 档案文档派生
// 约束: 全部为学号的确定性函数，不使用随机数
// ==========================================

use crate::config::import_config::{ImportConfig, SecretPolicy};
use crate::domain::student::{CanonicalRecord, PartitionKey, StudentProfile};
use crate::domain::types::CanonicalField;
use crate::importer::import_trait::DerivationService as DerivationServiceTrait;
use chrono::{DateTime, Utc};

pub const PROFILE_STATUS_ACTIVE: &str = "Active";
pub const IMPORT_SOURCE_BULK: &str = "bulk_import";

pub struct DerivationService {
    login_suffix: String,
    secret_policy: SecretPolicy,
}

impl DerivationService {
    pub fn new(login_suffix: impl Into<String>, secret_policy: SecretPolicy) -> Self {
        Self {
            login_suffix: login_suffix.into(),
            secret_policy,
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(config.login_suffix.clone(), config.secret_policy.clone())
    }
}

impl DerivationServiceTrait for DerivationService {
    fn derive_login_identifier(&self, roll_number: &str) -> String {
        format!(
            "{}{}",
            alphanumeric(roll_number).to_lowercase(),
            self.login_suffix
        )
    }

    fn derive_initial_secret(&self, roll_number: &str) -> String {
        match &self.secret_policy {
            SecretPolicy::Derived { suffix } => format!("{}{}", alphanumeric(roll_number), suffix),
            SecretPolicy::Fixed { value } => value.clone(),
        }
    }

    fn build_profile(
        &self,
        record: &CanonicalRecord,
        partition: &PartitionKey,
        auth_uid: Option<&str>,
        run_id: &str,
        imported_at: DateTime<Utc>,
    ) -> StudentProfile {
        let roll_number = record.roll_number().to_string();
        let student_name = record.student_name().to_string();

        // 文档 ID: 账号 uid 优先，缺失时使用学号
        let document_id = match auth_uid {
            Some(uid) if !uid.is_empty() => uid.to_string(),
            _ => alphanumeric(&roll_number),
        };
        let document_path = format!("{}/{}", partition.collection_path(), document_id);

        let mut fields = record.values.clone();
        fields.remove(&CanonicalField::SerialNumber);
        // 分区字段以最终分区键为准
        fields.insert(CanonicalField::Department, partition.department.clone());
        fields.insert(CanonicalField::Year, partition.year.clone());
        fields.insert(CanonicalField::Section, partition.section.clone());

        StudentProfile {
            document_id,
            document_path,
            run_id: run_id.to_string(),
            row_number: record.row_number,
            roll_number: roll_number.clone(),
            student_name: student_name.clone(),
            fields,
            partition: partition.clone(),
            department_code: partition.department.clone(),
            year_section: partition.group_key(),
            login_identifier: record.login_identifier.clone(),
            auth_uid: auth_uid.map(|s| s.to_string()),
            searchable_name: student_name.to_lowercase(),
            searchable_roll_number: roll_number.to_lowercase(),
            display_name: student_name.clone(),
            short_name: short_name(&student_name),
            initials: initials(&student_name),
            status: PROFILE_STATUS_ACTIVE.to_string(),
            import_source: IMPORT_SOURCE_BULK.to_string(),
            imported_at,
        }
    }
}

/// 仅保留 ASCII 字母与数字
pub fn alphanumeric(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// 前两个词
fn short_name(name: &str) -> String {
    name.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

/// 各词首字母（大写）
fn initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|w| w.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}
