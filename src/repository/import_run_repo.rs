// ==========================================
// 学生批量导入系统 - 导入历史仓储
// ==========================================
// 职责: 管理 import_run 表（每次运行一行汇总）
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import_run::{AbortReason, ImportRun};
use crate::domain::types::RunState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// 导入历史条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRunEntity {
    pub run: ImportRun,
    pub source_file: Option<String>,
}

pub struct ImportRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRunRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存运行汇总（同一 run_id 覆盖）
    pub fn save(&self, run: &ImportRun, source_file: Option<&str>) -> RepositoryResult<()> {
        let abort_reason = run
            .abort_reason
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::FieldValueError {
                field: "abort_reason".to_string(),
                message: e.to_string(),
            })?;

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO import_run (
                run_id, source_file, state, total, processed, succeeded, failed,
                duplicates, uncommitted, identity_created, identity_failed, flushes,
                abort_reason, started_at, finished_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                run.run_id,
                source_file,
                run.state.as_str(),
                run.total as i64,
                run.processed as i64,
                run.succeeded as i64,
                run.failed as i64,
                run.duplicates as i64,
                run.uncommitted as i64,
                run.identity_created as i64,
                run.identity_failed as i64,
                run.flushes as i64,
                abort_reason,
                run.started_at.map(|t| t.to_rfc3339()),
                run.finished_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 最近的运行（按开始时间倒序）
    pub fn list_recent(&self, limit: usize) -> RepositoryResult<Vec<ImportRunEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, source_file, state, total, processed, succeeded, failed,
                   duplicates, uncommitted, identity_created, identity_failed, flushes,
                   abort_reason, started_at, finished_at
            FROM import_run
            ORDER BY started_at DESC, run_id
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], map_run_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }
}

fn parse_time(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn map_run_row(row: &Row<'_>) -> rusqlite::Result<ImportRunEntity> {
    let count = |idx: usize| -> rusqlite::Result<usize> { Ok(row.get::<_, i64>(idx)? as usize) };
    let state: String = row.get(2)?;
    let abort_reason: Option<String> = row.get(12)?;

    let run = ImportRun {
        run_id: row.get(0)?,
        state: RunState::from_str(&state),
        total: count(3)?,
        processed: count(4)?,
        staged: 0,
        succeeded: count(5)?,
        failed: count(6)?,
        duplicates: count(7)?,
        uncommitted: count(8)?,
        identity_created: count(9)?,
        identity_failed: count(10)?,
        flushes: count(11)?,
        started_at: parse_time(row.get(13)?),
        finished_at: parse_time(row.get(14)?),
        // 无法解析的历史值按缺失处理
        abort_reason: abort_reason.and_then(|s| serde_json::from_str::<AbortReason>(&s).ok()),
    };

    Ok(ImportRunEntity {
        run,
        source_file: row.get(1)?,
    })
}
