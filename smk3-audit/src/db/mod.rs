//! Database access layer for smk3-audit
//!
//! One module per table. Rows are mapped by hand from TEXT ids and
//! RFC 3339 timestamps.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use smk3_common::{Error, Result};

pub mod clauses;
pub mod criteria;
pub mod documents;
pub mod recommendations;
pub mod results;
pub mod users;

pub use smk3_common::uuid_utils::parse_db_id;

/// Timestamp format written to TEXT columns
pub(crate) fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Corrupt timestamp '{}' in database: {}", value, e)))
}

pub(crate) fn parse_optional_time(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_time).transpose()
}

pub(crate) fn parse_optional_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .as_deref()
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d")
                .map_err(|e| Error::Internal(format!("Corrupt date '{}' in database: {}", v, e)))
        })
        .transpose()
}

#[cfg(test)]
pub(crate) mod test_support {
    use smk3_common::db::init_database;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Fresh schema in a temp file; keep the TempDir alive for the pool's lifetime
    pub async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }
}
