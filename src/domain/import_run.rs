// ==========================================
// 学生批量导入系统 - 导入运行聚合
// ==========================================
// 职责: ImportRun 统计快照 + 纯函数 reducer + 行级结果报告
// 状态机: Idle → Running → {Completed | Aborted}
// ==========================================

use crate::domain::types::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// AbortReason - 运行中止原因
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    /// 操作员取消
    Cancelled,
    /// 存储不可达（查重阶段）
    StoreUnavailable { message: String },
    /// 批量提交重试耗尽
    CommitExhausted {
        batch_no: usize,
        attempts: u32,
        message: String,
    },
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => write!(f, "操作员取消"),
            AbortReason::StoreUnavailable { message } => write!(f, "存储不可达: {}", message),
            AbortReason::CommitExhausted {
                batch_no,
                attempts,
                message,
            } => write!(
                f,
                "第 {} 批提交失败（已尝试 {} 次）: {}",
                batch_no, attempts, message
            ),
        }
    }
}

// ==========================================
// RunEvent - reducer 输入事件
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started { total: usize, at: DateTime<Utc> },
    /// 记录已暂存到当前批次
    RecordStaged { identity_created: bool },
    /// 记录处理失败（未暂存）
    RecordFailed { duplicate: bool },
    /// 一批记录已提交
    BatchCommitted { count: usize },
    /// 一批记录提交失败，被放弃
    BatchAbandoned { count: usize },
    Finished { at: DateTime<Utc> },
    Aborted { reason: AbortReason, at: DateTime<Utc> },
}

// ==========================================
// ImportRun - 运行统计快照（不可变，由 apply 生成新值）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRun {
    pub run_id: String,
    pub state: RunState,

    // 计数
    pub total: usize,            // 可导入记录总数
    pub processed: usize,        // 已处理（单调递增）
    pub staged: usize,           // 已暂存未提交
    pub succeeded: usize,        // 已提交
    pub failed: usize,           // 失败（含重复）
    pub duplicates: usize,       // 其中: 已存在
    pub uncommitted: usize,      // 提交失败被放弃
    pub identity_created: usize, // 账号开通成功
    pub identity_failed: usize,  // 账号开通失败
    pub flushes: usize,          // 成功提交的批次数

    // 时间与中止原因
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub abort_reason: Option<AbortReason>,
}

impl ImportRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: RunState::Idle,
            total: 0,
            processed: 0,
            staged: 0,
            succeeded: 0,
            failed: 0,
            duplicates: 0,
            uncommitted: 0,
            identity_created: 0,
            identity_failed: 0,
            flushes: 0,
            started_at: None,
            finished_at: None,
            abort_reason: None,
        }
    }

    /// 应用一个事件，返回新快照
    ///
    /// 终态之后的事件被忽略
    pub fn apply(self, event: RunEvent) -> Self {
        if self.state.is_terminal() {
            return self;
        }

        let mut next = self;
        match event {
            RunEvent::Started { total, at } => {
                next.state = RunState::Running;
                next.total = total;
                next.started_at = Some(at);
            }
            RunEvent::RecordStaged { identity_created } => {
                next.processed += 1;
                next.staged += 1;
                if identity_created {
                    next.identity_created += 1;
                } else {
                    next.identity_failed += 1;
                }
            }
            RunEvent::RecordFailed { duplicate } => {
                next.processed += 1;
                next.failed += 1;
                if duplicate {
                    next.duplicates += 1;
                }
            }
            RunEvent::BatchCommitted { count } => {
                let count = count.min(next.staged);
                next.staged -= count;
                next.succeeded += count;
                next.flushes += 1;
            }
            RunEvent::BatchAbandoned { count } => {
                let count = count.min(next.staged);
                next.staged -= count;
                next.uncommitted += count;
            }
            RunEvent::Finished { at } => {
                next.state = RunState::Completed;
                next.finished_at = Some(at);
            }
            RunEvent::Aborted { reason, at } => {
                next.state = RunState::Aborted;
                next.abort_reason = Some(reason);
                next.finished_at = Some(at);
            }
        }
        next
    }

    /// 进度百分比 (0-100)
    pub fn progress_percent(&self) -> u8 {
        if self.total == 0 {
            return if self.state.is_terminal() { 100 } else { 0 };
        }
        let pct = self.processed.min(self.total) * 100 / self.total;
        pct as u8
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}

// ==========================================
// 行级结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Committed,
    /// 已暂存，但所在批次未能提交
    Uncommitted,
    /// 学号已存在（存储或本次运行）
    Duplicate,
    Failed { reason: String },
    /// 运行中止前未处理
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityOutcome {
    Created { uid: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOutcome {
    pub row_number: usize,
    pub roll_number: String,
    pub status: RowStatus,
    pub identity: Option<IdentityOutcome>,
}

// ==========================================
// ImportRunReport - 运行结束后的只读报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRunReport {
    pub run: ImportRun,
    pub rows: Vec<RowOutcome>,
}

impl ImportRunReport {
    pub fn count_where(&self, pred: impl Fn(&RowStatus) -> bool) -> usize {
        self.rows.iter().filter(|r| pred(&r.status)).count()
    }

    /// 需要在新一次运行中重新提交的行（失败/未提交/未处理）
    pub fn rows_to_resubmit(&self) -> Vec<&RowOutcome> {
        self.rows
            .iter()
            .filter(|r| {
                matches!(
                    r.status,
                    RowStatus::Uncommitted | RowStatus::Failed { .. } | RowStatus::NotAttempted
                )
            })
            .collect()
    }
}
