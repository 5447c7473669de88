// ==========================================
// ImportPipeline 集成测试
// ==========================================
// 测试目标: 解析 → 表头映射 → 标准化 → 校验 → 分区探测 全流程
// ==========================================


use student_bulk_import::config::ImportConfig;
use student_bulk_import::domain::types::{CanonicalField, ValidationErrorKind};
use student_bulk_import::importer::{ImportError, ImportPipeline, PrepareOptions};
use student_bulk_import::domain::student::MappingWarning;
use student_bulk_import::logging;
use tempfile::TempDir;
use test_helpers::{text_row, write_csv, write_xlsx, XCell};

fn create_test_pipeline() -> ImportPipeline {
    ImportPipeline::new(ImportConfig::default())
}

#[test]
fn test_minimal_workbook_produces_one_record() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let path = write_xlsx(
        dir.path(),
        "students.xlsx",
        &[(
            "Sheet1",
            vec![
                text_row(&["Roll No", "Student Name", "Mobile"]),
                text_row(&["A100", "Jane Doe", "9876543210"]),
            ],
        )],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    assert_eq!(prepared.records.len(), 1);
    assert_eq!(prepared.eligible_count(), 1);
    let record = &prepared.records[0];
    assert_eq!(record.roll_number(), "A100");
    assert_eq!(record.student_name(), "Jane Doe");
    assert_eq!(record.get(CanonicalField::StudentMobile), Some("9876543210"));
    assert_eq!(record.row_number, 2);
    assert_eq!(record.login_identifier, "a100@mits.ac.in");

    // 同一文件再次预览，派生结果一致
    let again = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();
    assert_eq!(again.records[0].login_identifier, record.login_identifier);
    assert_eq!(again.records[0].initial_secret, record.initial_secret);
}

#[test]
fn test_numeric_phone_cell_and_dashed_phone() {
    let dir = TempDir::new().unwrap();
    let path = write_xlsx(
        dir.path(),
        "students.xlsx",
        &[(
            "Sheet1",
            vec![
                text_row(&["Roll No", "Student Name", "Mobile"]),
                vec![
                    XCell::from("A100"),
                    XCell::from("Jane Doe"),
                    XCell::from(9876543210.0),
                ],
                text_row(&["A101", "John Roe", "987-654-3210"]),
            ],
        )],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    assert_eq!(prepared.records.len(), 2);
    for record in &prepared.records {
        assert_eq!(record.get(CanonicalField::StudentMobile), Some("9876543210"));
    }
    assert!(prepared.issues().is_empty());
}

#[test]
fn test_rows_without_roll_or_name_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &[
            "Roll No,Student Name,Mobile",
            "A100,Jane Doe,9876543210",
            ",Nameless Roll,9876543211",
            "A102,,9876543212",
            ",,",
        ],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    assert_eq!(prepared.records.len(), 1);
    assert_eq!(prepared.skipped.len(), 2);
    assert!(prepared
        .records
        .iter()
        .all(|r| !r.roll_number().is_empty() && !r.student_name().is_empty()));
}

#[test]
fn test_invalid_fields_and_in_file_duplicates_are_not_eligible() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &[
            "Roll No,Student Name,Mobile,Gender",
            "A100,Jane Doe,9876543210,F",
            "A101,John Roe,12345,Male",
            "A102,Kim Lee,9876543212,Alien",
            "a100,Jane Again,9876543213,Female",
        ],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    assert_eq!(prepared.records.len(), 4);
    assert_eq!(prepared.eligible_count(), 1);
    assert_eq!(prepared.invalid_count(), 3);

    let kinds: Vec<(usize, ValidationErrorKind)> = prepared
        .issues()
        .iter()
        .map(|i| (i.row_number, i.kind))
        .collect();
    assert!(kinds.contains(&(3, ValidationErrorKind::InvalidFormat)));
    assert!(kinds.contains(&(4, ValidationErrorKind::InvalidEnum)));
    assert!(kinds.contains(&(5, ValidationErrorKind::Duplicate)));

    let eligible = prepared.eligible_records();
    assert_eq!(eligible[0].roll_number(), "A100");
    assert_eq!(eligible[0].get(CanonicalField::Gender), Some("Female"));
}

#[test]
fn test_missing_required_mapping_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &["Student Name,Mobile", "Jane Doe,9876543210"],
    );

    let err = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap_err();
    match err {
        ImportError::MappingIncomplete { missing } => {
            assert_eq!(missing, vec![CanonicalField::RollNumber]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_mapping_override_fixes_unrecognised_header() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &["PIN,Student Name", "A100,Jane Doe"],
    );

    let options = PrepareOptions {
        all_sheets: false,
        mapping_overrides: vec![(0, Some(CanonicalField::RollNumber))],
    };
    let prepared = create_test_pipeline().prepare_file(&path, &options).unwrap();

    assert_eq!(prepared.records[0].roll_number(), "A100");
    assert!(prepared.warnings().is_empty());
}

#[test]
fn test_duplicate_column_mapping_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &[
            "Roll No,Student Name,Mobile,Phone",
            "A100,Jane Doe,9876543210,9123456789",
        ],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    assert!(prepared.warnings().iter().any(|w| matches!(
        w,
        MappingWarning::DuplicateField {
            field: CanonicalField::StudentMobile,
            kept: 3,
            ..
        }
    )));
    assert_eq!(
        prepared.records[0].get(CanonicalField::StudentMobile),
        Some("9123456789")
    );
}

#[test]
fn test_all_sheets_uses_sheet_name_partition_hint() {
    let dir = TempDir::new().unwrap();
    let header = text_row(&["Roll No", "Student Name", "Department"]);
    let path = write_xlsx(
        dir.path(),
        "cohort.xlsx",
        &[
            (
                "III A",
                vec![header.clone(), text_row(&["A100", "Jane Doe", "CSE"])],
            ),
            (
                "II-B",
                vec![header.clone(), text_row(&["B200", "John Roe", "ECE"])],
            ),
            ("Notes", vec![]),
        ],
    );

    // 默认只解析第一个工作表，不使用表名提示
    let first_only = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();
    assert_eq!(first_only.records.len(), 1);
    assert_eq!(first_only.records[0].get(CanonicalField::Year), None);

    let options = PrepareOptions {
        all_sheets: true,
        ..Default::default()
    };
    let prepared = create_test_pipeline().prepare_file(&path, &options).unwrap();

    assert_eq!(prepared.sheets.len(), 2);
    assert_eq!(prepared.records.len(), 2);

    let first = &prepared.records[0];
    assert_eq!(first.sheet_name.as_deref(), Some("III A"));
    assert_eq!(first.get(CanonicalField::Year), Some("III"));
    assert_eq!(first.get(CanonicalField::Section), Some("A"));

    let second = &prepared.records[1];
    assert_eq!(second.get(CanonicalField::Department), Some("ECE"));
    assert_eq!(second.get(CanonicalField::Year), Some("II"));
    assert_eq!(second.get(CanonicalField::Section), Some("B"));

    assert_eq!(
        prepared.partitions.values(student_bulk_import::PartitionDimension::Year),
        &["II".to_string(), "III".to_string()]
    );
}

#[test]
fn test_too_many_rows_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut lines = vec!["Roll No,Student Name".to_string()];
    for i in 0..5 {
        lines.push(format!("A{},Student {}", i, i));
    }
    let refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let path = write_csv(dir.path(), "students.csv", &refs);

    let config = ImportConfig {
        max_rows_per_import: 4,
        ..ImportConfig::default()
    };
    let err = ImportPipeline::new(config)
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap_err();
    assert!(matches!(err, ImportError::TooManyRows { rows: 5, max: 4 }));
}

#[test]
fn test_unsupported_and_missing_files() {
    let dir = TempDir::new().unwrap();
    let txt = dir.path().join("students.txt");
    std::fs::write(&txt, "Roll No,Student Name\nA1,Jane\n").unwrap();

    let pipeline = create_test_pipeline();
    assert!(matches!(
        pipeline.prepare_file(&txt, &PrepareOptions::default()),
        Err(ImportError::UnsupportedFormat(_))
    ));
    assert!(matches!(
        pipeline.prepare_file(&dir.path().join("absent.csv"), &PrepareOptions::default()),
        Err(ImportError::FileNotFound(_))
    ));
}

#[test]
fn test_department_names_resolve_to_configured_codes() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        dir.path(),
        "students.csv",
        &[
            "Roll No,Student Name,Department",
            "A100,Jane Doe,Computer Science & Engineering",
            "A101,John Roe,cse",
        ],
    );

    let prepared = create_test_pipeline()
        .prepare_file(&path, &PrepareOptions::default())
        .unwrap();

    for record in &prepared.records {
        assert_eq!(record.get(CanonicalField::Department), Some("CSE"));
    }
    assert_eq!(
        prepared.partitions.values(student_bulk_import::PartitionDimension::Department),
        &["CSE".to_string()]
    );
    assert!(!prepared.partitions.has_unexpected());
}
