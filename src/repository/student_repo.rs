// ==========================================
// 学生批量导入系统 - 学生档案仓储
// ==========================================
// 职责: 管理 student_profile 表（查重 + 批量写入）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::student::{BatchCommit, PartitionKey, StudentProfile};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// StudentStore Trait
// ==========================================
// 用途: 执行器依赖的存储边界
// 实现者: StudentRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// 学号是否已存在（大小写不敏感）
    ///
    /// # 返回
    /// - Err(e) 且 e.is_unavailable(): 存储不可达
    async fn exists_by_identifier(&self, roll_number: &str) -> RepositoryResult<bool>;

    /// 在单个事务中写入一批档案
    ///
    /// # 参数
    /// - profiles: 同一分区的档案
    /// - partition: 分区键
    ///
    /// # 返回
    /// - Ok(BatchCommit): 已提交数量
    /// - Err: 整个事务回滚
    async fn write_batch(
        &self,
        profiles: &[StudentProfile],
        partition: &PartitionKey,
    ) -> RepositoryResult<BatchCommit>;
}

// ==========================================
// StudentRepositoryImpl
// ==========================================
pub struct StudentRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl StudentRepositoryImpl {
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

    fn insert_profiles_tx(
        tx: &Transaction,
        profiles: &[StudentProfile],
        partition: &PartitionKey,
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT OR REPLACE INTO student_profile (
                document_path, document_id, roll_number, student_name,
                department, year, section, year_section,
                login_identifier, auth_uid,
                searchable_name, searchable_roll_number, display_name, short_name, initials,
                fields_json, status, import_source, run_id, row_number, imported_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21
            )
            "#,
        )?;

        let mut count = 0;
        for profile in profiles {
            if profile.partition != *partition {
                return Err(RepositoryError::FieldValueError {
                    field: "partition".to_string(),
                    message: format!(
                        "档案 {} 的分区 {} 与批次分区 {} 不一致",
                        profile.roll_number,
                        profile.partition.collection_path(),
                        partition.collection_path()
                    ),
                });
            }

            let fields_json = serde_json::to_string(&profile.fields).map_err(|e| {
                RepositoryError::FieldValueError {
                    field: "fields_json".to_string(),
                    message: e.to_string(),
                }
            })?;

            stmt.execute(params![
                profile.document_path,
                profile.document_id,
                profile.roll_number,
                profile.student_name,
                partition.department,
                partition.year,
                partition.section,
                profile.year_section,
                profile.login_identifier,
                profile.auth_uid,
                profile.searchable_name,
                profile.searchable_roll_number,
                profile.display_name,
                profile.short_name,
                profile.initials,
                fields_json,
                profile.status,
                profile.import_source,
                profile.run_id,
                profile.row_number as i64,
                profile.imported_at.to_rfc3339(),
            ])?;
            count += 1;
        }

        Ok(count)
    }

    /// 按学号查询档案
    pub fn find_by_roll_number(&self, roll_number: &str) -> RepositoryResult<Option<StudentProfile>> {
        let conn = self.get_conn()?;
        let profile = conn
            .query_row(
                &format!(
                    "SELECT {} FROM student_profile WHERE UPPER(roll_number) = UPPER(TRIM(?1))",
                    PROFILE_COLUMNS
                ),
                params![roll_number],
                map_profile_row,
            )
            .optional()?;
        profile.transpose()
    }

    /// 查询某分区下全部档案（按学号排序）
    pub fn list_by_partition(&self, partition: &PartitionKey) -> RepositoryResult<Vec<StudentProfile>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM student_profile
             WHERE department = ?1 AND year = ?2 AND section = ?3
             ORDER BY roll_number",
            PROFILE_COLUMNS
        ))?;

        let rows = stmt.query_map(
            params![partition.department, partition.year, partition.section],
            map_profile_row,
        )?;

        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row??);
        }
        Ok(profiles)
    }

    /// 档案总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM student_profile", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }
}

#[async_trait]
impl StudentStore for StudentRepositoryImpl {
    async fn exists_by_identifier(&self, roll_number: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM student_profile WHERE UPPER(roll_number) = UPPER(TRIM(?1)) LIMIT 1",
                params![roll_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(exists.is_some())
    }

    async fn write_batch(
        &self,
        profiles: &[StudentProfile],
        partition: &PartitionKey,
    ) -> RepositoryResult<BatchCommit> {
        if profiles.is_empty() {
            return Ok(BatchCommit { committed: 0 });
        }

        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        let committed = Self::insert_profiles_tx(&tx, profiles, partition)?;
        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        Ok(BatchCommit { committed })
    }
}

const PROFILE_COLUMNS: &str = "document_path, document_id, roll_number, student_name, \
     department, year, section, year_section, login_identifier, auth_uid, \
     searchable_name, searchable_roll_number, display_name, short_name, initials, \
     fields_json, status, import_source, run_id, row_number, imported_at";

// 外层 Result 为 rusqlite 读取错误，内层为字段解析错误
fn map_profile_row(row: &Row<'_>) -> rusqlite::Result<RepositoryResult<StudentProfile>> {
    let fields_json: String = row.get(15)?;
    let imported_at_raw: String = row.get(20)?;
    let row_number: i64 = row.get(19)?;

    let fields = match serde_json::from_str(&fields_json) {
        Ok(fields) => fields,
        Err(e) => {
            return Ok(Err(RepositoryError::FieldValueError {
                field: "fields_json".to_string(),
                message: e.to_string(),
            }))
        }
    };
    let imported_at = match DateTime::parse_from_rfc3339(&imported_at_raw) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            return Ok(Err(RepositoryError::FieldValueError {
                field: "imported_at".to_string(),
                message: e.to_string(),
            }))
        }
    };

    let department: String = row.get(4)?;
    Ok(Ok(StudentProfile {
        document_path: row.get(0)?,
        document_id: row.get(1)?,
        roll_number: row.get(2)?,
        student_name: row.get(3)?,
        partition: PartitionKey::new(department.clone(), row.get::<_, String>(5)?, row.get::<_, String>(6)?),
        department_code: department,
        year_section: row.get(7)?,
        login_identifier: row.get(8)?,
        auth_uid: row.get(9)?,
        searchable_name: row.get(10)?,
        searchable_roll_number: row.get(11)?,
        display_name: row.get(12)?,
        short_name: row.get(13)?,
        initials: row.get(14)?,
        fields,
        status: row.get(16)?,
        import_source: row.get(17)?,
        run_id: row.get(18)?,
        row_number: row_number as usize,
        imported_at,
    }))
}
