//! Recommendation persistence
//!
//! Rows reference a clause id without a foreign key so they survive result
//! deletion and hard resets of evidence.

use super::{format_time, parse_db_id, parse_optional_time, parse_time};
use crate::models::{Recommendation, RecommendationStatus};
use chrono::{DateTime, Utc};
use smk3_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

fn map_recommendation(row: &SqliteRow) -> Result<Recommendation> {
    let status: String = row.get("status");
    Ok(Recommendation {
        id: parse_db_id(row.get("id"))?,
        clause_id: parse_db_id(row.get("clause_id"))?,
        recommendation_text: row.get("recommendation_text"),
        deadline: parse_time(row.get("deadline"))?,
        status: status.parse()?,
        created_by: parse_db_id(row.get("created_by"))?,
        created_at: parse_time(row.get("created_at"))?,
        completed_at: parse_optional_time(row.get("completed_at"))?,
    })
}

pub async fn insert_recommendation(pool: &SqlitePool, rec: &Recommendation) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO recommendations (
            id, clause_id, recommendation_text, deadline, status, created_by, created_at, completed_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(rec.id.to_string())
    .bind(rec.clause_id.to_string())
    .bind(&rec.recommendation_text)
    .bind(format_time(rec.deadline))
    .bind(rec.status.as_str())
    .bind(rec.created_by.to_string())
    .bind(format_time(rec.created_at))
    .bind(rec.completed_at.map(format_time))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_recommendation(pool: &SqlitePool, id: Uuid) -> Result<Option<Recommendation>> {
    let row = sqlx::query("SELECT * FROM recommendations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_recommendation).transpose()
}

/// Recommendations matching the optional filters, oldest first
pub async fn list_recommendations(
    pool: &SqlitePool,
    clause_id: Option<Uuid>,
    status: Option<RecommendationStatus>,
) -> Result<Vec<Recommendation>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM recommendations WHERE 1 = 1");
    if let Some(clause_id) = clause_id {
        builder.push(" AND clause_id = ").push_bind(clause_id.to_string());
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    builder.push(" ORDER BY created_at");

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(map_recommendation).collect()
}

/// Recommendations not yet completed
pub async fn list_open_recommendations(pool: &SqlitePool) -> Result<Vec<Recommendation>> {
    let rows = sqlx::query("SELECT * FROM recommendations WHERE status != 'completed' ORDER BY deadline")
        .fetch_all(pool)
        .await?;

    rows.iter().map(map_recommendation).collect()
}

pub async fn update_status(
    pool: &SqlitePool,
    id: Uuid,
    status: RecommendationStatus,
    completed_at: Option<DateTime<Utc>>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE recommendations SET status = ?, completed_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(completed_at.map(format_time))
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all_recommendations(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM recommendations").execute(pool).await?;
    Ok(result.rows_affected())
}
