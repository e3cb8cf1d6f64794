//! Database initialization on first run and on reopen

use smk3_common::db::init::init_database;
use sqlx::Row;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("smk3.db");

    let pool = init_database(&db_path).await.unwrap();
    assert!(db_path.exists(), "Database file was not created");

    let tables: Vec<String> = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(&pool)
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("name"))
        .collect();

    for expected in [
        "audit_results",
        "clauses",
        "criteria",
        "documents",
        "recommendations",
        "settings",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("smk3.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO settings (key, value) VALUES ('marker', 'kept')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    // Second initialization must not drop data
    let pool = init_database(&db_path).await.unwrap();
    let value: String = sqlx::query_scalar("SELECT value FROM settings WHERE key = 'marker'")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(value, "kept");
}

#[tokio::test]
async fn test_foreign_keys_cascade_clause_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("smk3.db")).await.unwrap();

    sqlx::query("INSERT INTO criteria (id, name, display_order, created_at) VALUES ('c1', 'K', 1, '2024-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO clauses (id, criterion_id, clause_number, title, created_at) VALUES ('k1', 'c1', '1.1.1', 'T', '2024-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();

    // Duplicate clause number within a criterion is rejected
    let duplicate = sqlx::query("INSERT INTO clauses (id, criterion_id, clause_number, title, created_at) VALUES ('k2', 'c1', '1.1.1', 'T', '2024-01-01T00:00:00Z')")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err());

    sqlx::query("DELETE FROM criteria WHERE id = 'c1'")
        .execute(&pool)
        .await
        .unwrap();
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clauses")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
