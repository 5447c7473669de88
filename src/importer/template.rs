// ==========================================
// 学生批量导入系统 - 导入模板
// ==========================================
// 职责: 输出固定示例数据集（CSV），供操作员按格式填写
// ==========================================

use crate::domain::types::CanonicalField;
use crate::importer::error::ImportResult;
use csv::WriterBuilder;
use std::io::Write;
use std::path::Path;

/// 模板列（顺序即输出顺序）
pub const TEMPLATE_FIELDS: [CanonicalField; 12] = [
    CanonicalField::SerialNumber,
    CanonicalField::RollNumber,
    CanonicalField::StudentName,
    CanonicalField::Year,
    CanonicalField::Section,
    CanonicalField::Quota,
    CanonicalField::Gender,
    CanonicalField::StudentMobile,
    CanonicalField::FatherMobile,
    CanonicalField::FatherName,
    CanonicalField::MotherName,
    CanonicalField::Address,
];

const TEMPLATE_ROWS: [[&str; 12]; 2] = [
    [
        "1",
        "23691A3201",
        "Anil Kumar",
        "III",
        "A",
        "CC",
        "Male",
        "9876543210",
        "9876543200",
        "Ramesh Kumar",
        "Lakshmi Devi",
        "12-3, Main Road, Madanapalle",
    ],
    [
        "2",
        "23691A3202",
        "Bhavya Sri",
        "III",
        "A",
        "MG",
        "Female",
        "9876543211",
        "9876543201",
        "Suresh Babu",
        "Padma",
        "4-56, Temple Street, Tirupati",
    ],
];

/// 模板表头
pub fn template_headers() -> Vec<&'static str> {
    TEMPLATE_FIELDS.iter().map(|f| f.label()).collect()
}

/// 写出模板到任意 Writer
pub fn write_template<W: Write>(writer: W) -> ImportResult<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(template_headers())?;
    for row in TEMPLATE_ROWS {
        csv_writer.write_record(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// 写出模板到文件
pub fn write_template_file(path: &Path) -> ImportResult<()> {
    let file = std::fs::File::create(path)?;
    write_template(file)
}
