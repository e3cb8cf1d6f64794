//! Evidence document metadata

use super::{format_time, parse_db_id, parse_time};
use crate::models::EvidenceDocument;
use smk3_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const DOCUMENT_COLUMNS: &str =
    "d.id, d.clause_id, d.filename, d.blob_ref, d.mime_type, d.size, d.uploaded_by, d.uploaded_at";

fn map_document(row: &SqliteRow) -> Result<EvidenceDocument> {
    Ok(EvidenceDocument {
        id: parse_db_id(row.get("id"))?,
        clause_id: parse_db_id(row.get("clause_id"))?,
        filename: row.get("filename"),
        blob_ref: row.get("blob_ref"),
        mime_type: row.get("mime_type"),
        size: row.get("size"),
        uploaded_by: parse_db_id(row.get("uploaded_by"))?,
        uploaded_at: parse_time(row.get("uploaded_at"))?,
    })
}

pub async fn insert_document(pool: &SqlitePool, doc: &EvidenceDocument) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (id, clause_id, filename, blob_ref, mime_type, size, uploaded_by, uploaded_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(doc.id.to_string())
    .bind(doc.clause_id.to_string())
    .bind(&doc.filename)
    .bind(&doc.blob_ref)
    .bind(&doc.mime_type)
    .bind(doc.size)
    .bind(doc.uploaded_by.to_string())
    .bind(format_time(doc.uploaded_at))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_document(pool: &SqlitePool, id: Uuid) -> Result<Option<EvidenceDocument>> {
    let row = sqlx::query(&format!("SELECT {} FROM documents d WHERE d.id = ?", DOCUMENT_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_document).transpose()
}

/// Documents of one clause in upload order
pub async fn list_documents_for_clause(
    pool: &SqlitePool,
    clause_id: Uuid,
) -> Result<Vec<EvidenceDocument>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM documents d WHERE d.clause_id = ? ORDER BY d.uploaded_at, d.rowid",
        DOCUMENT_COLUMNS
    ))
    .bind(clause_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_document).collect()
}

/// Every document, e.g. for the hard reset blob sweep
pub async fn list_all_documents(pool: &SqlitePool) -> Result<Vec<EvidenceDocument>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM documents d ORDER BY d.uploaded_at, d.rowid",
        DOCUMENT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_document).collect()
}

/// Documents belonging to any clause of a criterion
pub async fn list_documents_for_criterion(
    pool: &SqlitePool,
    criteria_id: Uuid,
) -> Result<Vec<EvidenceDocument>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM documents d
        JOIN clauses c ON c.id = d.clause_id
        WHERE c.criterion_id = ?
        ORDER BY d.uploaded_at, d.rowid
        "#,
        DOCUMENT_COLUMNS
    ))
    .bind(criteria_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_document).collect()
}

pub async fn count_documents_for_clause(pool: &SqlitePool, clause_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE clause_id = ?")
        .bind(clause_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn delete_document(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove every document row, returning how many were deleted
pub async fn delete_all_documents(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM documents").execute(pool).await?;
    Ok(result.rows_affected())
}
