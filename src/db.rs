// ==========================================
// 学生批量导入系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表（幂等）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS student_identity (
    uid              TEXT PRIMARY KEY,
    login_identifier TEXT NOT NULL UNIQUE,
    created_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS student_profile (
    document_path          TEXT PRIMARY KEY,
    document_id            TEXT NOT NULL,
    roll_number            TEXT NOT NULL UNIQUE,
    student_name           TEXT NOT NULL,
    department             TEXT NOT NULL,
    year                   TEXT NOT NULL,
    section                TEXT NOT NULL,
    year_section           TEXT NOT NULL,
    login_identifier       TEXT NOT NULL,
    auth_uid               TEXT,
    searchable_name        TEXT NOT NULL,
    searchable_roll_number TEXT NOT NULL,
    display_name           TEXT NOT NULL,
    short_name             TEXT NOT NULL,
    initials               TEXT NOT NULL,
    fields_json            TEXT NOT NULL,
    status                 TEXT NOT NULL,
    import_source          TEXT NOT NULL,
    run_id                 TEXT NOT NULL,
    row_number             INTEGER NOT NULL,
    imported_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_student_profile_partition
    ON student_profile (department, year_section);

CREATE TABLE IF NOT EXISTS import_run (
    run_id           TEXT PRIMARY KEY,
    source_file      TEXT,
    state            TEXT NOT NULL,
    total            INTEGER NOT NULL,
    processed        INTEGER NOT NULL,
    succeeded        INTEGER NOT NULL,
    failed           INTEGER NOT NULL,
    duplicates       INTEGER NOT NULL,
    uncommitted      INTEGER NOT NULL,
    identity_created INTEGER NOT NULL,
    identity_failed  INTEGER NOT NULL,
    flushes          INTEGER NOT NULL,
    abort_reason     TEXT,
    started_at       TEXT,
    finished_at      TEXT
);

CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// 建表（幂等），并登记 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    if read_schema_version(conn)?.is_none() {
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [CURRENT_SCHEMA_VERSION],
        )?;
    }
    Ok(())
}

/// 读取 schema_version（若表不存在或为空则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "STUDENT_IMPORT_DB_PATH";

/// 默认数据库路径
///
/// 优先级: 环境变量 STUDENT_IMPORT_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./student_import.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("student-bulk-import");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("student_import.db");
        }
    }

    path.to_string_lossy().to_string()
}
