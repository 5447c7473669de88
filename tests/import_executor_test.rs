// ==========================================
// ImportExecutor 集成测试
// ==========================================
// 测试目标: 分批提交、账号开通失败、提交重试耗尽、取消、并发保护
// ==========================================


use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use student_bulk_import::config::ImportConfig;
use student_bulk_import::domain::import_run::{AbortReason, IdentityOutcome, RowStatus};
use student_bulk_import::domain::student::{PartitionKey, PartitionStrategy};
use student_bulk_import::domain::types::RunState;
use student_bulk_import::engine::{ExecutorOptions, ImportExecutor, ImportJob};
use student_bulk_import::importer::ImportError;
use student_bulk_import::logging;
use student_bulk_import::repository::IdentityProvider;
use test_helpers::{
    create_test_records, BlockingIdentity, CancellingIdentity, HangingIdentity, MockIdentity,
    MockStore, StoreFault,
};
use tokio_util::sync::CancellationToken;

fn test_options(flush_batch_size: usize) -> ExecutorOptions {
    ExecutorOptions {
        flush_batch_size,
        throttle: Duration::ZERO,
        commit_retry_limit: 3,
        retry_backoff: Duration::ZERO,
        identity_timeout: Duration::from_secs(5),
    }
}

fn create_test_executor<P: IdentityProvider>(
    store: Arc<MockStore>,
    identity: Arc<P>,
    flush_batch_size: usize,
) -> ImportExecutor<MockStore, P> {
    ImportExecutor::new(store, identity, &ImportConfig::default())
        .with_options(test_options(flush_batch_size))
}

fn create_test_job(n: usize) -> ImportJob {
    ImportJob {
        records: create_test_records(n),
        strategy: PartitionStrategy::Uniform {
            key: PartitionKey::new("CSE", "III", "A"),
        },
        source_file: Some("students.xlsx".to_string()),
    }
}

#[tokio::test]
async fn test_flushes_in_batches_of_configured_size() {
    logging::init_test();
    let store = Arc::new(MockStore::new());
    let executor = create_test_executor(store.clone(), Arc::new(MockIdentity::healthy()), 50);

    let report = executor
        .execute(create_test_job(120), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Completed);
    assert_eq!(store.batch_sizes(), vec![50, 50, 20]);
    assert_eq!(report.run.flushes, 3);
    assert_eq!(report.run.succeeded, 120);
    assert_eq!(report.run.processed, 120);
    assert_eq!(report.run.total, 120);
    assert_eq!(report.count_where(|s| *s == RowStatus::Committed), 120);

    // 落库顺序与记录顺序一致
    let rolls: Vec<String> = store
        .profiles
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.roll_number.clone())
        .collect();
    let expected: Vec<String> = (1..=120).map(|i| format!("R{:04}", i)).collect();
    assert_eq!(rolls, expected);
}

#[tokio::test]
async fn test_identity_failure_still_persists_profile() {
    let store = Arc::new(MockStore::new());
    let executor =
        create_test_executor(store.clone(), Arc::new(MockIdentity::failing_on(7)), 50);

    let report = executor
        .execute(create_test_job(10), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Completed);
    assert_eq!(report.run.succeeded, 10);
    assert_eq!(report.run.identity_created, 9);
    assert_eq!(report.run.identity_failed, 1);

    let seventh = &report.rows[6];
    assert_eq!(seventh.status, RowStatus::Committed);
    assert!(matches!(
        seventh.identity,
        Some(IdentityOutcome::Failed { .. })
    ));

    let profiles = store.profiles.lock().unwrap();
    assert_eq!(profiles[6].auth_uid, None);
    assert_eq!(profiles[6].document_id, "R0007");
    assert_eq!(profiles[0].auth_uid.as_deref(), Some("uid-1"));
    assert_eq!(profiles[0].document_id, "uid-1");
}

#[tokio::test]
async fn test_store_failing_every_flush_aborts_run() {
    let store = Arc::new(MockStore::with_fault(StoreFault::FailWrites));
    let executor = create_test_executor(store.clone(), Arc::new(MockIdentity::healthy()), 4);

    let report = executor
        .execute(create_test_job(10), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Aborted);
    assert_eq!(report.run.succeeded, 0);
    assert_eq!(report.run.uncommitted, 4);
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 3);
    assert!(matches!(
        report.run.abort_reason,
        Some(AbortReason::CommitExhausted { attempts: 3, .. })
    ));
    assert_eq!(report.count_where(|s| *s == RowStatus::Uncommitted), 4);
    assert_eq!(report.count_where(|s| *s == RowStatus::NotAttempted), 6);
    assert_eq!(report.rows_to_resubmit().len(), 10);
}

#[tokio::test]
async fn test_store_unavailable_during_duplicate_check_aborts_run() {
    let store = Arc::new(MockStore::with_fault(StoreFault::Unavailable));
    let executor = create_test_executor(store.clone(), Arc::new(MockIdentity::healthy()), 50);

    let report = executor
        .execute(create_test_job(3), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Aborted);
    assert!(matches!(
        report.run.abort_reason,
        Some(AbortReason::StoreUnavailable { .. })
    ));
    assert_eq!(report.run.processed, 0);
    assert_eq!(store.write_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_existing_rolls_are_counted_as_duplicates() {
    let store = Arc::new(MockStore::with_existing(&["r0002", "R0004"]));
    let executor = create_test_executor(store.clone(), Arc::new(MockIdentity::healthy()), 50);

    let report = executor
        .execute(create_test_job(5), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Completed);
    assert_eq!(report.run.processed, 5);
    assert_eq!(report.run.succeeded, 3);
    assert_eq!(report.run.failed, 2);
    assert_eq!(report.run.duplicates, 2);
    assert_eq!(report.rows[1].status, RowStatus::Duplicate);
    assert_eq!(report.rows[3].status, RowStatus::Duplicate);
}

#[tokio::test]
async fn test_cancellation_flushes_staged_and_aborts() {
    let token = CancellationToken::new();
    let identity = Arc::new(CancellingIdentity {
        cancel_after: 3,
        token: token.clone(),
        calls: Default::default(),
    });
    let store = Arc::new(MockStore::new());
    let executor = create_test_executor(store.clone(), identity, 50);

    let report = executor.execute(create_test_job(10), token).await.unwrap();

    assert_eq!(report.run.state, RunState::Aborted);
    assert_eq!(report.run.abort_reason, Some(AbortReason::Cancelled));
    assert_eq!(report.run.processed, 3);
    assert_eq!(report.run.succeeded, 3);
    assert_eq!(store.batch_sizes(), vec![3]);
    assert_eq!(report.count_where(|s| *s == RowStatus::NotAttempted), 7);
}

#[tokio::test]
async fn test_identity_timeout_counts_as_identity_failure() {
    let store = Arc::new(MockStore::new());
    let executor = ImportExecutor::new(store.clone(), Arc::new(HangingIdentity), &ImportConfig::default())
        .with_options(ExecutorOptions {
            identity_timeout: Duration::from_millis(20),
            ..test_options(50)
        });

    let report = executor
        .execute(create_test_job(2), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.run.state, RunState::Completed);
    assert_eq!(report.run.succeeded, 2);
    assert_eq!(report.run.identity_failed, 2);
}

#[tokio::test]
async fn test_second_run_while_active_is_rejected() {
    let identity = Arc::new(BlockingIdentity::new());
    let store = Arc::new(MockStore::new());
    let executor = create_test_executor(store, identity.clone(), 50);

    let first = executor.execute(create_test_job(1), CancellationToken::new());
    let second = async {
        identity.entered.notified().await;
        assert!(executor.is_running());
        let result = executor
            .execute(create_test_job(1), CancellationToken::new())
            .await;
        identity.release.notify_one();
        result
    };

    let (first, second) = tokio::join!(first, second);
    assert!(matches!(second, Err(ImportError::RunAlreadyActive)));
    assert_eq!(first.unwrap().run.state, RunState::Completed);
    assert!(!executor.is_running());
}

#[tokio::test]
async fn test_progress_is_monotonic_and_complete() {
    let store = Arc::new(MockStore::new());
    let executor = create_test_executor(store, Arc::new(MockIdentity::healthy()), 7);
    let mut progress = executor.subscribe();

    let watcher = async {
        let mut seen = Vec::new();
        while progress.changed().await {
            let snapshot = progress.snapshot();
            seen.push(snapshot.processed);
            if snapshot.is_finished() {
                break;
            }
        }
        seen
    };

    let (report, seen) = tokio::join!(
        executor.execute(create_test_job(25), CancellationToken::new()),
        watcher
    );

    let report = report.unwrap();
    assert_eq!(report.run.processed, 25);
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last().copied(), Some(25));
    assert_eq!(progress.percent(), 100);
}
