// ==========================================
// 学生批量导入系统 - 文件解析器实现
// ==========================================
// 职责: 阶段 1 - 表格文件 → DecodedSheet
// 支持: Excel (.xlsx/.xls/.xlsm/.ods) / CSV (.csv)
// 约束: 纯函数，丢弃全空行；无数据行时报 Decode 错误
// ==========================================

use crate::domain::student::{DecodedSheet, RawRow};
use crate::domain::types::CellValue;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::FileParser;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xls", "xlsm", "ods"];

/// 检查文件存在并读取全部字节
fn read_file(path: &Path) -> ImportResult<Vec<u8>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read(path)?)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 由表头 + 数据行组装工作表；无有效数据行时返回 None
fn assemble_sheet(
    sheet_name: &str,
    headers: Vec<String>,
    rows: Vec<RawRow>,
) -> Option<DecodedSheet> {
    let rows: Vec<RawRow> = rows.into_iter().filter(|r| !r.is_blank()).collect();
    if rows.is_empty() {
        return None;
    }
    Some(DecodedSheet {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
    })
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl ExcelParser {
    /// 解析工作簿字节流的第一个工作表
    pub fn decode(&self, bytes: &[u8]) -> ImportResult<DecodedSheet> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::Decode("工作簿无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        decode_range(&sheet_name, &range)
            .ok_or_else(|| ImportError::Decode(format!("工作表 {} 无数据行", sheet_name)))
    }

    /// 逐个解析全部工作表（无数据的工作表被跳过）
    ///
    /// # 返回
    /// - Err(Decode): 没有任何工作表包含数据
    pub fn decode_all_sheets(&self, bytes: &[u8]) -> ImportResult<Vec<DecodedSheet>> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let mut sheets = Vec::new();
        for sheet_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet_name)?;
            match decode_range(&sheet_name, &range) {
                Some(sheet) => {
                    debug!(sheet = %sheet_name, rows = sheet.rows.len(), "工作表解析完成");
                    sheets.push(sheet);
                }
                None => debug!(sheet = %sheet_name, "工作表无数据，跳过"),
            }
        }

        if sheets.is_empty() {
            return Err(ImportError::Decode("工作簿中没有包含数据的工作表".to_string()));
        }
        Ok(sheets)
    }
}

fn decode_range(sheet_name: &str, range: &Range<Data>) -> Option<DecodedSheet> {
    // range 可能不从 A1 开始，行号按绝对位置计算（1-based）
    let start_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()?
        .iter()
        .map(|cell| cell_to_value(cell).to_text().trim().to_string())
        .collect();

    let rows = rows_iter
        .enumerate()
        .map(|(idx, cells)| {
            RawRow::new(
                start_row + idx + 2,
                cells.iter().map(cell_to_value).collect(),
            )
        })
        .collect();

    assemble_sheet(sheet_name, headers, rows)
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

impl FileParser for ExcelParser {
    fn parse_first_sheet(&self, file_path: &Path) -> ImportResult<DecodedSheet> {
        let ext = extension_of(file_path);
        if !WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }
        let bytes = read_file(file_path)?;
        self.decode(&bytes)
    }

    fn parse_all_sheets(&self, file_path: &Path) -> ImportResult<Vec<DecodedSheet>> {
        let ext = extension_of(file_path);
        if !WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ImportError::UnsupportedFormat(ext));
        }
        let bytes = read_file(file_path)?;
        self.decode_all_sheets(&bytes)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 解析 CSV 字节流（单一“工作表”，名称由调用方给出）
    pub fn decode(&self, bytes: &[u8], sheet_name: &str) -> ImportResult<DecodedSheet> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(bytes);

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        // 读取所有行
        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            let row_number = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            rows.push(RawRow::new(
                row_number,
                record.iter().map(CellValue::from).collect(),
            ));
        }

        assemble_sheet(sheet_name, headers, rows)
            .ok_or_else(|| ImportError::Decode("CSV 文件无数据行".to_string()))
    }
}

impl FileParser for CsvParser {
    fn parse_first_sheet(&self, file_path: &Path) -> ImportResult<DecodedSheet> {
        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }
        let bytes = read_file(file_path)?;
        let sheet_name = file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("csv");
        self.decode(&bytes, sheet_name)
    }

    fn parse_all_sheets(&self, file_path: &Path) -> ImportResult<Vec<DecodedSheet>> {
        Ok(vec![self.parse_first_sheet(file_path)?])
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    fn parser_for(&self, path: &Path) -> ImportResult<Box<dyn FileParser>> {
        let ext = extension_of(path);
        match ext.as_str() {
            "csv" => Ok(Box::new(CsvParser)),
            e if WORKBOOK_EXTENSIONS.contains(&e) => Ok(Box::new(ExcelParser)),
            _ => Err(ImportError::UnsupportedFormat(ext)),
        }
    }
}

impl FileParser for UniversalFileParser {
    fn parse_first_sheet(&self, file_path: &Path) -> ImportResult<DecodedSheet> {
        self.parser_for(file_path)?.parse_first_sheet(file_path)
    }

    fn parse_all_sheets(&self, file_path: &Path) -> ImportResult<Vec<DecodedSheet>> {
        self.parser_for(file_path)?.parse_all_sheets(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "Roll No,Student Name,Mobile",
            "A100,Jane Doe,9876543210",
            "A101,John Roe,9876543211",
        ]);

        let sheet = CsvParser.parse_first_sheet(temp_file.path()).unwrap();

        assert_eq!(sheet.headers, vec!["Roll No", "Student Name", "Mobile"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].row_number, 2);
        assert_eq!(sheet.rows[0].cell(0), &CellValue::Text("A100".to_string()));
        assert_eq!(sheet.rows[1].row_number, 3);
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["Roll No,Name", "A1,Jane", ",", "A2,John"]);

        let sheet = CsvParser.parse_first_sheet(temp_file.path()).unwrap();

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1].row_number, 4);
    }

    #[test]
    fn test_csv_parser_header_only_is_decode_error() {
        let temp_file = csv_file(&["Roll No,Name"]);
        let result = CsvParser.parse_first_sheet(temp_file.path());
        assert!(matches!(result, Err(ImportError::Decode(_))));
    }

    #[test]
    fn test_file_not_found_and_unsupported() {
        let result = UniversalFileParser.parse_first_sheet(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));

        let result = UniversalFileParser.parse_first_sheet(Path::new("students.pdf"));
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_excel_decode_rejects_garbage() {
        let result = ExcelParser.decode(b"definitely not a workbook");
        assert!(matches!(result, Err(ImportError::Decode(_))));
    }
}
