//! Database initialization
//!
//! Creates the SQLite database on first run and brings every table into
//! existence with `CREATE TABLE IF NOT EXISTS`, so startup is idempotent.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas are per-connection, so they go on the connect options rather
    // than a one-off query against the pool
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create every table used by smk3-audit (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_criteria_table(pool).await?;
    create_clauses_table(pool).await?;
    create_documents_table(pool).await?;
    create_audit_results_table(pool).await?;
    create_recommendations_table(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores application key-value pairs (currently the token signing secret).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('admin', 'auditor', 'auditee')),
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_criteria_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS criteria (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            display_order INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Clause numbers are unique within their criterion
async fn create_clauses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clauses (
            id TEXT PRIMARY KEY,
            criterion_id TEXT NOT NULL REFERENCES criteria(id) ON DELETE CASCADE,
            clause_number TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            knowledge_base TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL,
            UNIQUE (criterion_id, clause_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_clauses_criterion ON clauses(criterion_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            clause_id TEXT NOT NULL REFERENCES clauses(id) ON DELETE CASCADE,
            filename TEXT NOT NULL,
            blob_ref TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            size INTEGER NOT NULL,
            uploaded_by TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_clause ON documents(clause_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// One result per clause; auditor overlay columns stay NULL until a verdict
async fn create_audit_results_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_results (
            id TEXT PRIMARY KEY,
            clause_id TEXT NOT NULL UNIQUE REFERENCES clauses(id) ON DELETE CASCADE,
            score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
            status TEXT NOT NULL,
            reasoning TEXT NOT NULL DEFAULT '',
            feedback TEXT NOT NULL DEFAULT '',
            improvement_suggestions TEXT NOT NULL DEFAULT '',
            audited_at TEXT NOT NULL,
            audited_by TEXT,
            auditor_status TEXT,
            auditor_notes TEXT,
            agreed_date TEXT,
            assessed_at TEXT,
            assessed_by TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Recommendations carry no foreign key to results: they outlive them
async fn create_recommendations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recommendations (
            id TEXT PRIMARY KEY,
            clause_id TEXT NOT NULL,
            recommendation_text TEXT NOT NULL,
            deadline TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pending', 'in_progress', 'completed')),
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            completed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
