// ==========================================
// 学生批量导入系统 - 账号开通仓储
// ==========================================
// 职责: 管理 student_identity 表（登录账号 → uid）
// 红线: 不落库初始密码
// ==========================================

use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// 已开通的账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub uid: String,
}

/// 账号开通错误（单条记录级别，不中止运行）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("账号已存在: {0}")]
    AlreadyExists(String),

    #[error("账号开通超时 ({0}ms)")]
    Timeout(u64),

    #[error("账号开通失败: {0}")]
    Other(String),
}

impl From<RepositoryError> for IdentityError {
    fn from(err: RepositoryError) -> Self {
        IdentityError::Other(err.to_string())
    }
}

// ==========================================
// IdentityProvider Trait
// ==========================================
// 用途: 执行器依赖的账号开通边界
// 实现者: IdentityRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 开通登录账号
    ///
    /// # 参数
    /// - login_identifier: 登录账号
    /// - initial_secret: 初始密码
    async fn create_identity(
        &self,
        login_identifier: &str,
        initial_secret: &str,
    ) -> Result<IdentityRecord, IdentityError>;
}

// ==========================================
// IdentityRepositoryImpl
// ==========================================
pub struct IdentityRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl IdentityRepositoryImpl {
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

    /// 按登录账号查询 uid
    pub fn find_uid(&self, login_identifier: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let uid = conn
            .query_row(
                "SELECT uid FROM student_identity WHERE login_identifier = ?1",
                params![login_identifier],
                |row| row.get(0),
            )
            .optional()?;
        Ok(uid)
    }

    fn insert_identity(&self, login_identifier: &str) -> Result<IdentityRecord, IdentityError> {
        let conn = self.get_conn()?;
        let uid = Uuid::new_v4().simple().to_string();

        let result = conn.execute(
            "INSERT INTO student_identity (uid, login_identifier, created_at) VALUES (?1, ?2, ?3)",
            params![uid, login_identifier, Utc::now().to_rfc3339()],
        );

        match result.map_err(RepositoryError::from) {
            Ok(_) => Ok(IdentityRecord { uid }),
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                Err(IdentityError::AlreadyExists(login_identifier.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl IdentityProvider for IdentityRepositoryImpl {
    async fn create_identity(
        &self,
        login_identifier: &str,
        initial_secret: &str,
    ) -> Result<IdentityRecord, IdentityError> {
        if initial_secret.is_empty() {
            return Err(IdentityError::Other("初始密码为空".to_string()));
        }
        self.insert_identity(login_identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup_repo() -> IdentityRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        IdentityRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_create_identity() {
        let repo = setup_repo();
        let record = repo
            .create_identity("a100@mits.ac.in", "A100@123")
            .await
            .unwrap();

        assert!(!record.uid.is_empty());
        assert_eq!(
            repo.find_uid("a100@mits.ac.in").unwrap(),
            Some(record.uid)
        );
    }

    #[tokio::test]
    async fn test_create_identity_already_exists() {
        let repo = setup_repo();
        repo.create_identity("a100@mits.ac.in", "A100@123")
            .await
            .unwrap();

        let err = repo
            .create_identity("a100@mits.ac.in", "A100@123")
            .await
            .unwrap_err();
        assert_eq!(err, IdentityError::AlreadyExists("a100@mits.ac.in".to_string()));
    }

    #[tokio::test]
    async fn test_create_identity_rejects_empty_secret() {
        let repo = setup_repo();
        let err = repo.create_identity("a100@mits.ac.in", "").await.unwrap_err();
        assert!(matches!(err, IdentityError::Other(_)));
        assert_eq!(repo.find_uid("a100@mits.ac.in").unwrap(), None);
    }
}
