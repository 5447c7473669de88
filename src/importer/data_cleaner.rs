// ==========================================
// 学生批量导入系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / 数字提取 / 占位符清除 / 年级罗马化 / 性别归一 / 日期归一
// ==========================================

use crate::config::import_config::DepartmentOption;
use crate::domain::types::CanonicalField;
use crate::importer::import_trait::DataCleaner as DataCleanerTrait;
use chrono::{Duration, NaiveDate};

/// Excel 序列号 25569 = 1970-01-01
const EXCEL_UNIX_EPOCH_SERIAL: f64 = 25569.0;
/// Excel 最大日期 9999-12-31
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const PLACEHOLDERS: [&str; 8] = ["-", "—", "–", "na", "n/a", "unknown", "nil", "none"];

const ROMAN: [&str; 12] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII",
];

const ORDINAL_WORDS: [&str; 12] = [
    "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
    "tenth", "eleventh", "twelfth",
];

const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d-%b-%Y", "%d %b %Y",
    "%d-%B-%Y",
];

pub struct DataCleaner;

impl DataCleanerTrait for DataCleaner {
    fn clean_text(&self, value: &str) -> String {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn digits_only(&self, value: &str) -> String {
        value.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    fn is_placeholder(&self, value: &str) -> bool {
        let lower = value.trim().to_lowercase();
        PLACEHOLDERS.contains(&lower.as_str())
    }

    fn to_roman_year(&self, value: &str) -> Option<String> {
        let lower = value.trim().to_lowercase();
        let token: String = lower
            .replace("year", "")
            .replace("yr", "")
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        if token.is_empty() {
            return None;
        }

        // 数字（含序数后缀）: 1 / 01 / 1st / 3rd
        let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            let suffix = &token[digits.len()..];
            if !suffix.is_empty() && !matches!(suffix, "st" | "nd" | "rd" | "th") {
                return None;
            }
            return digits
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=ROMAN.len()).contains(n))
                .map(|n| ROMAN[n - 1].to_string());
        }

        // 英文序数词: first / third
        if let Some(idx) = ORDINAL_WORDS.iter().position(|w| *w == token) {
            return Some(ROMAN[idx].to_string());
        }

        // 罗马数字本身: i / iii
        let upper = token.to_uppercase();
        ROMAN
            .iter()
            .find(|r| **r == upper)
            .map(|r| r.to_string())
    }

    fn excel_serial_to_date(&self, serial: f64) -> Option<NaiveDate> {
        if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
            return None;
        }
        let days = (serial - EXCEL_UNIX_EPOCH_SERIAL).floor() as i64;
        NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(Duration::days(days))
    }

    fn clean_field(&self, field: CanonicalField, raw: &str) -> Option<String> {
        let text = self.clean_text(raw);
        if text.is_empty() {
            return None;
        }

        let cleaned = match field {
            CanonicalField::StudentMobile
            | CanonicalField::FatherMobile
            | CanonicalField::AadhaarNumber => self.digits_only(&text),
            CanonicalField::Year => self.clean_year(&text)?,
            CanonicalField::Section => self.clean_section(&text)?,
            CanonicalField::Department => self.clean_department(&text)?,
            CanonicalField::Gender => self.clean_gender(&text),
            CanonicalField::Quota => text.to_uppercase(),
            CanonicalField::Email => text.to_lowercase(),
            CanonicalField::DateOfBirth => self.clean_date(&text),
            _ => text,
        };

        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }
}

impl DataCleaner {
    /// 年级: 占位符清除；单个字母（非罗马数字）视为班级误填并清除；其余罗马化
    pub fn clean_year(&self, value: &str) -> Option<String> {
        if self.is_placeholder(value) {
            return None;
        }
        if let Some(roman) = self.to_roman_year(value) {
            return Some(roman);
        }
        let trimmed = value.trim();
        if trimmed.chars().count() == 1 && trimmed.chars().all(|c| c.is_alphabetic()) {
            return None;
        }
        Some(trimmed.to_uppercase())
    }

    /// 班级: 占位符清除；去掉 "Section"/"Sec" 前缀；大写
    pub fn clean_section(&self, value: &str) -> Option<String> {
        if self.is_placeholder(value) {
            return None;
        }
        let lower = value.trim().to_lowercase();
        let stripped = lower
            .strip_prefix("section")
            .or_else(|| lower.strip_prefix("sec"))
            .unwrap_or(&lower);
        let section: String = stripped
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_uppercase();
        if section.is_empty() {
            None
        } else {
            Some(section)
        }
    }

    /// 院系代码: 占位符清除；大写；空格/连字符 → 下划线
    pub fn clean_department(&self, value: &str) -> Option<String> {
        if self.is_placeholder(value) {
            return None;
        }
        let code: String = value
            .trim()
            .to_uppercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        Some(code)
    }

    /// 院系名称或代码 → 院系代码
    ///
    /// 按院系表比较代码或名称（不区分大小写，忽略多余空白），未匹配时按 clean_department 处理
    pub fn resolve_department(
        &self,
        value: &str,
        departments: &[DepartmentOption],
    ) -> Option<String> {
        let text = self.clean_text(value);
        if text.is_empty() || self.is_placeholder(&text) {
            return None;
        }
        let wanted = text.to_lowercase();
        departments
            .iter()
            .find(|d| {
                d.code.eq_ignore_ascii_case(&wanted)
                    || self.clean_text(&d.label).to_lowercase() == wanted
            })
            .map(|d| d.code.clone())
            .or_else(|| self.clean_department(&text))
    }

    /// 性别归一: M/Male/Boy → Male，F/Female/Girl → Female，O/Other → Other
    ///
    /// 无法识别时原样返回，由校验器报告
    pub fn clean_gender(&self, value: &str) -> String {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" | "boy" => "Male".to_string(),
            "f" | "female" | "girl" => "Female".to_string(),
            "o" | "other" | "others" | "transgender" => "Other".to_string(),
            _ => value.trim().to_string(),
        }
    }

    /// 日期归一为 YYYY-MM-DD（支持 Excel 序列号与常见文本格式）
    ///
    /// 无法识别时原样返回，由校验器报告
    pub fn clean_date(&self, value: &str) -> String {
        let trimmed = value.trim();

        if let Ok(serial) = trimmed.parse::<f64>() {
            if let Some(date) = self.excel_serial_to_date(serial) {
                return date.format("%Y-%m-%d").to_string();
            }
        }

        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
                return date.format("%Y-%m-%d").to_string();
            }
        }

        trimmed.to_string()
    }
}
