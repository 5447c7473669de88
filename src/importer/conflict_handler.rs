// ==========================================
// 学生批量导入系统 - 冲突处理器实现
// ==========================================
// 职责: 检测同一文件内重复学号（大小写不敏感）
// ==========================================

use crate::domain::student::CanonicalRecord;
use crate::importer::import_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::HashMap;

pub struct ConflictHandler;

/// 学号比较键
pub fn roll_key(roll_number: &str) -> String {
    roll_number.trim().to_uppercase()
}

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测同一文件内重复学号
    ///
    /// # 返回
    /// - Vec<(记录下标, 学号)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, records: &[CanonicalRecord]) -> Vec<(usize, String)> {
        let mut first_occurrence: HashMap<String, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for (index, record) in records.iter().enumerate() {
            let roll = record.roll_number();
            if roll.is_empty() {
                continue;
            }
            let key = roll_key(roll);
            if first_occurrence.contains_key(&key) {
                duplicates.push((index, roll.to_string()));
            } else {
                first_occurrence.insert(key, index);
            }
        }

        duplicates
    }
}
