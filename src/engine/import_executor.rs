// ==========================================
// 学生批量导入系统 - 导入执行引擎
// ==========================================
// 职责: 逐条查重 → 开通账号 → 构建档案 → 分批提交
// 状态机: Idle → Running → {Completed | Aborted}
// 红线: 单条记录失败不会使运行失败；记录严格按文件顺序处理
// ==========================================

use crate::config::import_config::ImportConfig;
use crate::domain::import_run::{
    AbortReason, IdentityOutcome, ImportRun, ImportRunReport, RowOutcome, RowStatus, RunEvent,
};
use crate::domain::student::{CanonicalRecord, PartitionKey, PartitionStrategy, StudentProfile};
use crate::importer::conflict_handler::roll_key;
use crate::importer::derivation::DerivationService;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::import_trait::DerivationService as _;
use crate::repository::identity_repo::{IdentityError, IdentityProvider};
use crate::repository::student_repo::StudentStore;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ExecutorOptions - 执行参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub flush_batch_size: usize,
    pub throttle: Duration,
    pub commit_retry_limit: u32,
    pub retry_backoff: Duration,
    pub identity_timeout: Duration,
}

impl ExecutorOptions {
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            flush_batch_size: config.flush_batch_size.max(1),
            throttle: Duration::from_millis(config.throttle_ms),
            commit_retry_limit: config.commit_retry_limit.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            identity_timeout: Duration::from_millis(config.identity_timeout_ms),
        }
    }
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self::from_config(&ImportConfig::default())
    }
}

// ==========================================
// ImportJob - 一次运行的输入
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportJob {
    /// 可导入记录（已通过校验，文件顺序）
    pub records: Vec<CanonicalRecord>,
    /// 操作员确认的分区方式
    pub strategy: PartitionStrategy,
    /// 来源文件名（记录在运行日志中）
    pub source_file: Option<String>,
}

// ==========================================
// ImportProgress - 进度观察句柄（只读）
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportProgress {
    rx: watch::Receiver<ImportRun>,
}

impl ImportProgress {
    /// 当前快照
    pub fn snapshot(&self) -> ImportRun {
        self.rx.borrow().clone()
    }

    /// 当前进度 (0-100)
    pub fn percent(&self) -> u8 {
        self.rx.borrow().progress_percent()
    }

    /// 等待下一次更新
    ///
    /// # 返回
    /// - false: 执行器已释放
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

// 已暂存的档案（记录下标用于回写行级结果）
struct StagedProfile {
    index: usize,
    profile: StudentProfile,
}

// 单次运行的可变状态，由执行器独占
struct RunContext {
    run: ImportRun,
    rows: Vec<RowOutcome>,
    staged: Vec<StagedProfile>,
    staged_rolls: HashSet<String>,
    batch_no: usize,
}

impl RunContext {
    fn apply(&mut self, event: RunEvent) {
        self.run = self.run.clone().apply(event);
    }
}

// 运行占用标记，drop 时释放
struct ActiveRunGuard<'a>(&'a AtomicBool);

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// 单条记录处理结果
enum RecordStep {
    Continue,
    Abort(AbortReason),
}

// ==========================================
// ImportExecutor
// ==========================================
pub struct ImportExecutor<S: ?Sized, P: ?Sized>
where
    S: StudentStore,
    P: IdentityProvider,
{
    store: Arc<S>,
    identity: Arc<P>,
    options: ExecutorOptions,
    derivation: DerivationService,
    active: AtomicBool,
    progress_tx: watch::Sender<ImportRun>,
}

impl<S: ?Sized, P: ?Sized> ImportExecutor<S, P>
where
    S: StudentStore,
    P: IdentityProvider,
{
    /// 创建执行器
    ///
    /// # 参数
    /// - store: 档案存储
    /// - identity: 账号开通服务
    /// - config: 导入配置（批量大小、节流、重试、账号派生规则）
    pub fn new(store: Arc<S>, identity: Arc<P>, config: &ImportConfig) -> Self {
        let (progress_tx, _) = watch::channel(ImportRun::new(String::new()));
        Self {
            store,
            identity,
            options: ExecutorOptions::from_config(config),
            derivation: DerivationService::from_config(config),
            active: AtomicBool::new(false),
            progress_tx,
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    /// 订阅进度
    pub fn subscribe(&self) -> ImportProgress {
        ImportProgress {
            rx: self.progress_tx.subscribe(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn try_begin(&self) -> ImportResult<ActiveRunGuard<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| ImportError::RunAlreadyActive)?;
        Ok(ActiveRunGuard(&self.active))
    }

    fn publish(&self, ctx: &RunContext) {
        self.progress_tx.send_replace(ctx.run.clone());
    }

    /// 执行导入（主入口）
    ///
    /// # 参数
    /// - job: 可导入记录 + 分区方式
    /// - cancel: 协作式取消令牌（每条记录前检查一次）
    ///
    /// # 返回
    /// - Ok(ImportRunReport): 运行结束（Completed 或 Aborted）
    /// - Err(RunAlreadyActive): 同一执行器已有运行中的任务
    ///
    /// # 流程
    /// 1. 取消检查
    /// 2. 分区解析
    /// 3. 查重（存储 + 本次已暂存）
    /// 4. 开通账号（超时受限，失败仍落库）
    /// 5. 构建档案并暂存，满批提交
    /// 6. 发布进度 + 节流
    #[instrument(
        skip(self, job, cancel),
        fields(records = job.records.len(), source_file = job.source_file.as_deref().unwrap_or("-"))
    )]
    pub async fn execute(
        &self,
        job: ImportJob,
        cancel: CancellationToken,
    ) -> ImportResult<ImportRunReport> {
        let _guard = self.try_begin()?;

        let run_id = Uuid::new_v4().to_string();
        let rows = job
            .records
            .iter()
            .map(|record| RowOutcome {
                row_number: record.row_number,
                roll_number: record.roll_number().to_string(),
                status: RowStatus::NotAttempted,
                identity: None,
            })
            .collect();

        let mut ctx = RunContext {
            run: ImportRun::new(run_id.clone()),
            rows,
            staged: Vec::with_capacity(self.options.flush_batch_size),
            staged_rolls: HashSet::new(),
            batch_no: 0,
        };
        ctx.apply(RunEvent::Started {
            total: job.records.len(),
            at: Utc::now(),
        });
        self.publish(&ctx);
        info!(
            run_id = %run_id,
            total = job.records.len(),
            source_file = job.source_file.as_deref().unwrap_or("-"),
            "导入运行开始"
        );

        let mut abort: Option<AbortReason> = None;

        for (index, record) in job.records.iter().enumerate() {
            // 步骤 1: 取消检查
            if cancel.is_cancelled() {
                warn!(run_id = %run_id, processed = ctx.run.processed, "导入已被取消");
                abort = Some(AbortReason::Cancelled);
                break;
            }

            match self.process_record(&mut ctx, index, record, &job.strategy).await {
                RecordStep::Continue => {}
                RecordStep::Abort(reason) => {
                    abort = Some(reason);
                    self.publish(&ctx);
                    break;
                }
            }

            if ctx.staged.len() >= self.options.flush_batch_size {
                if let Err(reason) = self.flush(&mut ctx).await {
                    abort = Some(reason);
                    self.publish(&ctx);
                    break;
                }
            }

            self.publish(&ctx);
            self.throttle().await;
        }

        // 收尾: 提交剩余暂存记录
        match abort {
            Some(AbortReason::StoreUnavailable { .. }) => {
                // 存储不可达，暂存批次不再尝试提交
                self.abandon_staged(&mut ctx);
            }
            Some(AbortReason::CommitExhausted { .. }) => {}
            Some(AbortReason::Cancelled) | None => {
                if let Err(reason) = self.flush(&mut ctx).await {
                    abort = Some(reason);
                }
            }
        }

        match abort {
            Some(reason) => {
                error!(run_id = %run_id, reason = %reason, "导入运行中止");
                ctx.apply(RunEvent::Aborted {
                    reason,
                    at: Utc::now(),
                });
            }
            None => {
                ctx.apply(RunEvent::Finished { at: Utc::now() });
            }
        }
        self.publish(&ctx);

        let run = ctx.run;
        info!(
            run_id = %run.run_id,
            state = %run.state,
            processed = run.processed,
            succeeded = run.succeeded,
            failed = run.failed,
            duplicates = run.duplicates,
            uncommitted = run.uncommitted,
            identity_failed = run.identity_failed,
            flushes = run.flushes,
            "导入运行结束"
        );

        Ok(ImportRunReport {
            run,
            rows: ctx.rows,
        })
    }

    // 步骤 2-5: 处理单条记录
    async fn process_record(
        &self,
        ctx: &mut RunContext,
        index: usize,
        record: &CanonicalRecord,
        strategy: &PartitionStrategy,
    ) -> RecordStep {
        let roll_number = record.roll_number();

        // 步骤 2: 分区解析
        let partition = match strategy.resolve(record) {
            Some(partition) => partition,
            None => {
                warn!(row_number = record.row_number, roll_number, "分区信息缺失");
                self.fail_record(ctx, index, "分区信息缺失".to_string(), false);
                return RecordStep::Continue;
            }
        };

        // 步骤 3: 查重
        if ctx.staged_rolls.contains(&roll_key(roll_number)) {
            debug!(roll_number, "学号已在本次运行中暂存");
            self.fail_record(ctx, index, String::new(), true);
            return RecordStep::Continue;
        }
        match self.store.exists_by_identifier(roll_number).await {
            Ok(false) => {}
            Ok(true) => {
                debug!(roll_number, "学号已存在");
                self.fail_record(ctx, index, String::new(), true);
                return RecordStep::Continue;
            }
            Err(e) if e.is_unavailable() => {
                error!(roll_number, error = %e, "查重时存储不可达");
                return RecordStep::Abort(AbortReason::StoreUnavailable {
                    message: e.to_string(),
                });
            }
            Err(e) => {
                warn!(roll_number, error = %e, "查重失败");
                self.fail_record(ctx, index, format!("查重失败: {}", e), false);
                return RecordStep::Continue;
            }
        }

        // 步骤 4: 开通账号
        let identity = match tokio::time::timeout(
            self.options.identity_timeout,
            self.identity
                .create_identity(&record.login_identifier, &record.initial_secret),
        )
        .await
        {
            Ok(Ok(created)) => IdentityOutcome::Created { uid: created.uid },
            Ok(Err(e)) => {
                warn!(roll_number, error = %e, "账号开通失败，档案仍将落库");
                IdentityOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                let e = IdentityError::Timeout(self.options.identity_timeout.as_millis() as u64);
                warn!(roll_number, error = %e, "账号开通超时，档案仍将落库");
                IdentityOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        // 步骤 5: 构建档案并暂存
        let auth_uid = match &identity {
            IdentityOutcome::Created { uid } => Some(uid.as_str()),
            IdentityOutcome::Failed { .. } => None,
        };
        let profile = self.derivation.build_profile(
            record,
            &partition,
            auth_uid,
            &ctx.run.run_id,
            Utc::now(),
        );

        let identity_created = auth_uid.is_some();
        if let Some(row) = ctx.rows.get_mut(index) {
            row.identity = Some(identity);
        }
        ctx.staged_rolls.insert(roll_key(roll_number));
        ctx.staged.push(StagedProfile { index, profile });
        ctx.apply(RunEvent::RecordStaged { identity_created });

        RecordStep::Continue
    }

    fn fail_record(&self, ctx: &mut RunContext, index: usize, reason: String, duplicate: bool) {
        if let Some(row) = ctx.rows.get_mut(index) {
            row.status = if duplicate {
                RowStatus::Duplicate
            } else {
                RowStatus::Failed { reason }
            };
        }
        ctx.apply(RunEvent::RecordFailed { duplicate });
    }

    // 放弃全部暂存记录（标记为未提交）
    fn abandon_staged(&self, ctx: &mut RunContext) {
        let abandoned: Vec<StagedProfile> = ctx.staged.drain(..).collect();
        for staged in &abandoned {
            if let Some(row) = ctx.rows.get_mut(staged.index) {
                row.status = RowStatus::Uncommitted;
            }
        }
        if !abandoned.is_empty() {
            ctx.apply(RunEvent::BatchAbandoned {
                count: abandoned.len(),
            });
        }
    }

    /// 提交暂存批次
    ///
    /// 同一批次内按分区分组（保持首次出现顺序），每组一次 write_batch
    ///
    /// # 返回
    /// - Err(CommitExhausted): 某组重试耗尽，该组及后续组标记为未提交
    async fn flush(&self, ctx: &mut RunContext) -> Result<(), AbortReason> {
        if ctx.staged.is_empty() {
            return Ok(());
        }
        ctx.batch_no += 1;
        let batch_no = ctx.batch_no;

        let staged: Vec<StagedProfile> = ctx.staged.drain(..).collect();
        let mut groups: Vec<(PartitionKey, Vec<StagedProfile>)> = Vec::new();
        for item in staged {
            match groups
                .iter_mut()
                .find(|(key, _)| *key == item.profile.partition)
            {
                Some((_, members)) => members.push(item),
                None => groups.push((item.profile.partition.clone(), vec![item])),
            }
        }

        debug!(batch_no, groups = groups.len(), "提交暂存批次");

        let mut remaining = groups.into_iter();
        while let Some((partition, members)) = remaining.next() {
            let profiles: Vec<StudentProfile> =
                members.iter().map(|m| m.profile.clone()).collect();

            match self.commit_with_retry(&profiles, &partition, batch_no).await {
                Ok(committed) => {
                    let committed = committed.min(members.len());
                    let (confirmed, unconfirmed) = members.split_at(committed);
                    for member in confirmed {
                        if let Some(row) = ctx.rows.get_mut(member.index) {
                            row.status = RowStatus::Committed;
                        }
                    }
                    ctx.apply(RunEvent::BatchCommitted { count: committed });

                    // 存储确认条数不足，未确认部分按未提交上报
                    if !unconfirmed.is_empty() {
                        for member in unconfirmed {
                            if let Some(row) = ctx.rows.get_mut(member.index) {
                                row.status = RowStatus::Uncommitted;
                            }
                        }
                        ctx.apply(RunEvent::BatchAbandoned {
                            count: unconfirmed.len(),
                        });
                        warn!(
                            batch_no,
                            sent = members.len(),
                            committed,
                            "存储确认条数少于提交条数"
                        );
                    }
                    info!(
                        batch_no,
                        partition = %partition.collection_path(),
                        committed,
                        "批次提交成功"
                    );
                }
                Err(reason) => {
                    // 该组及未尝试的后续组全部放弃
                    ctx.staged = members;
                    ctx.staged.extend(remaining.flat_map(|(_, rest)| rest));
                    self.abandon_staged(ctx);
                    return Err(reason);
                }
            }
        }

        Ok(())
    }

    async fn commit_with_retry(
        &self,
        profiles: &[StudentProfile],
        partition: &PartitionKey,
        batch_no: usize,
    ) -> Result<usize, AbortReason> {
        let limit = self.options.commit_retry_limit.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.store.write_batch(profiles, partition).await {
                Ok(commit) => return Ok(commit.committed),
                Err(e) if attempt < limit => {
                    warn!(batch_no, attempt, limit, error = %e, "批次提交失败，稍后重试");
                    tokio::time::sleep(self.options.retry_backoff).await;
                }
                Err(e) => {
                    error!(batch_no, attempt, error = %e, "批次提交重试耗尽");
                    return Err(AbortReason::CommitExhausted {
                        batch_no,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    async fn throttle(&self) {
        if self.options.throttle.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.options.throttle).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::student::PartitionHint;
    use crate::domain::types::CanonicalField;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::domain::student::BatchCommit;
    use crate::repository::identity_repo::IdentityRecord;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        existing: Vec<String>,
        batches: Mutex<Vec<(PartitionKey, usize)>>,
        fail_writes: bool,
        /// 每批少确认的条数
        short_by: usize,
    }

    #[async_trait]
    impl StudentStore for MemoryStore {
        async fn exists_by_identifier(&self, roll_number: &str) -> RepositoryResult<bool> {
            Ok(self.existing.iter().any(|r| r.eq_ignore_ascii_case(roll_number)))
        }

        async fn write_batch(
            &self,
            profiles: &[StudentProfile],
            partition: &PartitionKey,
        ) -> RepositoryResult<BatchCommit> {
            if self.fail_writes {
                return Err(RepositoryError::DatabaseTransactionError("disk full".into()));
            }
            self.batches
                .lock()
                .unwrap()
                .push((partition.clone(), profiles.len()));
            Ok(BatchCommit {
                committed: profiles.len().saturating_sub(self.short_by),
            })
        }
    }

    struct OkIdentity;

    #[async_trait]
    impl IdentityProvider for OkIdentity {
        async fn create_identity(
            &self,
            login_identifier: &str,
            _initial_secret: &str,
        ) -> Result<IdentityRecord, IdentityError> {
            Ok(IdentityRecord {
                uid: format!("uid-{}", login_identifier),
            })
        }
    }

    fn create_test_record(roll: &str, row_number: usize, section: Option<&str>) -> CanonicalRecord {
        let mut values = BTreeMap::new();
        values.insert(CanonicalField::RollNumber, roll.to_string());
        values.insert(CanonicalField::StudentName, "Jane Doe".to_string());
        if let Some(section) = section {
            values.insert(CanonicalField::Department, "CSE".to_string());
            values.insert(CanonicalField::Year, "III".to_string());
            values.insert(CanonicalField::Section, section.to_string());
        }
        CanonicalRecord {
            row_number,
            sheet_name: None,
            values,
            login_identifier: format!("{}@mits.ac.in", roll.to_lowercase()),
            initial_secret: format!("{}@123", roll),
        }
    }

    fn fast_options() -> ExecutorOptions {
        ExecutorOptions {
            flush_batch_size: 2,
            throttle: Duration::ZERO,
            commit_retry_limit: 2,
            retry_backoff: Duration::ZERO,
            identity_timeout: Duration::from_secs(5),
        }
    }

    fn uniform() -> PartitionStrategy {
        PartitionStrategy::Uniform {
            key: PartitionKey::new("CSE", "III", "A"),
        }
    }

    #[tokio::test]
    async fn test_duplicates_in_store_and_run() {
        let store = Arc::new(MemoryStore {
            existing: vec!["A1".to_string()],
            ..Default::default()
        });
        let executor = ImportExecutor::new(store.clone(), Arc::new(OkIdentity), &ImportConfig::default())
            .with_options(fast_options());

        let job = ImportJob {
            records: vec![
                create_test_record("a1", 2, None),
                create_test_record("A2", 3, None),
                create_test_record("a2", 4, None),
            ],
            strategy: uniform(),
            source_file: None,
        };

        let report = executor.execute(job, CancellationToken::new()).await.unwrap();
        assert_eq!(report.run.state, crate::domain::types::RunState::Completed);
        assert_eq!(report.run.processed, 3);
        assert_eq!(report.run.succeeded, 1);
        assert_eq!(report.run.duplicates, 2);
        assert_eq!(report.rows[0].status, RowStatus::Duplicate);
        assert_eq!(report.rows[1].status, RowStatus::Committed);
        assert_eq!(report.rows[2].status, RowStatus::Duplicate);
    }

    #[tokio::test]
    async fn test_per_record_partition_groups_flush() {
        let store = Arc::new(MemoryStore::default());
        let executor = ImportExecutor::new(store.clone(), Arc::new(OkIdentity), &ImportConfig::default())
            .with_options(fast_options());

        let job = ImportJob {
            records: vec![
                create_test_record("A1", 2, Some("A")),
                create_test_record("A2", 3, Some("B")),
                create_test_record("A3", 4, None),
            ],
            strategy: PartitionStrategy::PerRecord {
                fallback: PartitionHint::default(),
            },
            source_file: None,
        };

        let report = executor.execute(job, CancellationToken::new()).await.unwrap();
        assert_eq!(report.run.succeeded, 2);
        assert_eq!(report.run.failed, 1);
        assert_eq!(
            report.rows[2].status,
            RowStatus::Failed {
                reason: "分区信息缺失".to_string()
            }
        );

        let batches = store.batches.lock().unwrap().clone();
        assert_eq!(
            batches,
            vec![
                (PartitionKey::new("CSE", "III", "A"), 1),
                (PartitionKey::new("CSE", "III", "B"), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_commit_retry_exhausted_aborts() {
        let store = Arc::new(MemoryStore {
            fail_writes: true,
            ..Default::default()
        });
        let executor = ImportExecutor::new(store, Arc::new(OkIdentity), &ImportConfig::default())
            .with_options(fast_options());

        let job = ImportJob {
            records: (0..5)
                .map(|i| create_test_record(&format!("A{}", i), i + 2, None))
                .collect(),
            strategy: uniform(),
            source_file: None,
        };

        let report = executor.execute(job, CancellationToken::new()).await.unwrap();
        assert_eq!(report.run.state, crate::domain::types::RunState::Aborted);
        assert_eq!(report.run.succeeded, 0);
        assert_eq!(report.run.uncommitted, 2);
        assert!(matches!(
            report.run.abort_reason,
            Some(AbortReason::CommitExhausted {
                batch_no: 1,
                attempts: 2,
                ..
            })
        ));
        assert_eq!(report.count_where(|s| *s == RowStatus::NotAttempted), 3);
        assert!(!executor.is_running());
    }

    #[tokio::test]
    async fn test_progress_snapshot_after_run() {
        let store = Arc::new(MemoryStore::default());
        let executor = ImportExecutor::new(store, Arc::new(OkIdentity), &ImportConfig::default())
            .with_options(fast_options());
        let progress = executor.subscribe();

        let job = ImportJob {
            records: vec![create_test_record("A1", 2, None)],
            strategy: uniform(),
            source_file: None,
        };
        executor.execute(job, CancellationToken::new()).await.unwrap();

        assert_eq!(progress.percent(), 100);
        assert!(progress.snapshot().is_finished());
    }

    #[tokio::test]
    async fn test_short_commit_reports_unconfirmed_rows_as_uncommitted() {
        let store = Arc::new(MemoryStore {
            short_by: 1,
            ..Default::default()
        });
        let executor = ImportExecutor::new(store.clone(), Arc::new(OkIdentity), &ImportConfig::default())
            .with_options(ExecutorOptions {
                flush_batch_size: 10,
                ..fast_options()
            });

        let job = ImportJob {
            records: vec![
                create_test_record("A1", 2, None),
                create_test_record("A2", 3, None),
                create_test_record("A3", 4, None),
            ],
            strategy: uniform(),
            source_file: Some("students.xlsx".to_string()),
        };

        let report = executor.execute(job, CancellationToken::new()).await.unwrap();
        assert_eq!(report.run.succeeded, 2);
        assert_eq!(report.run.staged, 0);
        assert_eq!(report.run.uncommitted, 1);
        assert_eq!(
            report.count_where(|s| *s == RowStatus::Committed),
            report.run.succeeded
        );
        assert_eq!(report.rows[2].status, RowStatus::Uncommitted);
        assert_eq!(report.rows_to_resubmit().len(), 1);
    }
}
