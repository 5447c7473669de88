// ==========================================
// ImportApi 端到端测试
// ==========================================
// 测试目标: 模板文件 → 预览 → 选择分区 → 执行 → 落库 → 历史
// ==========================================


use student_bulk_import::api::{ApiError, ImportApi};
use student_bulk_import::domain::import_run::RowStatus;
use student_bulk_import::domain::student::{PartitionHint, PartitionKey};
use student_bulk_import::domain::types::RunState;
use student_bulk_import::importer::template::write_template_file;
use student_bulk_import::importer::PrepareOptions;
use student_bulk_import::repository::StudentRepositoryImpl;
use tempfile::TempDir;
use test_helpers::create_test_db;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_template_import_end_to_end() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let dir = TempDir::new().unwrap();
    let template = dir.path().join("template.csv");
    write_template_file(&template).unwrap();

    let api = ImportApi::open(&db_path).await.unwrap();

    // 1. 预览
    let preview = api.preview(&template, &PrepareOptions::default()).unwrap();
    assert_eq!(preview.total_records, 2);
    assert_eq!(preview.eligible, 2);
    assert!(preview.issues.is_empty());
    assert_eq!(preview.suggested_partition.year.as_deref(), Some("III"));
    assert_eq!(preview.suggested_partition.section.as_deref(), Some("A"));

    // 2. 选择分区（模板不含院系列，由操作员指定）
    let prepared = api.prepare(&template, &PrepareOptions::default()).unwrap();
    let selection = PartitionHint {
        department: Some("cse".to_string()),
        ..prepared.partitions.suggest_default()
    };
    let strategy = api.build_strategy(&selection, false).unwrap();

    // 3. 执行
    let response = api
        .run_import(&prepared, strategy.clone(), Some("template.csv"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.report.run.state, RunState::Completed);
    assert_eq!(response.report.run.succeeded, 2);
    assert_eq!(response.report.run.identity_created, 2);
    assert!(response.rows_to_resubmit.is_empty());
    assert_eq!(api.progress().percent(), 100);

    // 4. 落库结果
    let repo = StudentRepositoryImpl::new(&db_path).unwrap();
    let stored = repo
        .list_by_partition(&PartitionKey::new("CSE", "III", "A"))
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].roll_number, "23691A3201");
    assert!(stored[0].auth_uid.is_some());
    assert_eq!(stored[0].login_identifier, "23691a3201@mits.ac.in");

    // 5. 再次导入：全部判定为重复
    let second = api
        .run_import(&prepared, strategy, Some("template.csv"), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.report.run.state, RunState::Completed);
    assert_eq!(second.report.run.succeeded, 0);
    assert_eq!(second.report.run.duplicates, 2);
    assert_eq!(
        second.report.count_where(|s| *s == RowStatus::Duplicate),
        2
    );
    assert_eq!(repo.count().unwrap(), 2);

    // 6. 历史
    let history = api.list_history(10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history
        .iter()
        .all(|h| h.source_file.as_deref() == Some("template.csv")));
}

#[tokio::test]
async fn test_uniform_strategy_requires_all_dimensions() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = ImportApi::open(&db_path).await.unwrap();

    let selection = PartitionHint {
        department: Some("CSE".to_string()),
        year: None,
        section: Some("A".to_string()),
    };
    assert!(matches!(
        api.build_strategy(&selection, false),
        Err(ApiError::InvalidInput(_))
    ));
    assert!(api.build_strategy(&selection, true).is_ok());
}

#[tokio::test]
async fn test_preview_missing_file_is_not_found() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let api = ImportApi::open(&db_path).await.unwrap();
    let dir = TempDir::new().unwrap();

    let result = api.preview(&dir.path().join("absent.xlsx"), &PrepareOptions::default());
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}
