//! Audit results and the auditor overlay
//!
//! A clause has at most one result. Re-analysis replaces it in a single
//! upsert keyed by `clause_id`, which also clears any previous verdict.

use super::{format_time, parse_db_id, parse_optional_date, parse_optional_time, parse_time};
use crate::models::{AuditResult, AuditorOverlay, ComplianceStatus, Verdict};
use smk3_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const RESULT_COLUMNS: &str = r#"
    id, clause_id, score, status, reasoning, feedback, improvement_suggestions,
    audited_at, audited_by, auditor_status, auditor_notes, agreed_date,
    assessed_at, assessed_by
"#;

fn map_result(row: &SqliteRow) -> Result<AuditResult> {
    let status: String = row.get("status");
    let audited_by: Option<String> = row.get("audited_by");

    let auditor_status: Option<String> = row.get("auditor_status");
    let overlay = match auditor_status {
        Some(verdict) => {
            let assessed_at = parse_optional_time(row.get("assessed_at"))?
                .ok_or_else(|| Error::Internal("Verdict without assessment time".to_string()))?;
            let assessed_by: Option<String> = row.get("assessed_by");
            let assessed_by = assessed_by
                .ok_or_else(|| Error::Internal("Verdict without assessor".to_string()))?;

            Some(AuditorOverlay {
                auditor_status: verdict.parse::<Verdict>()?,
                auditor_notes: row.get("auditor_notes"),
                agreed_date: parse_optional_date(row.get("agreed_date"))?,
                auditor_assessed_at: assessed_at,
                auditor_assessed_by: parse_db_id(&assessed_by)?,
            })
        }
        None => None,
    };

    Ok(AuditResult {
        id: parse_db_id(row.get("id"))?,
        clause_id: parse_db_id(row.get("clause_id"))?,
        score: row.get("score"),
        status: status.parse::<ComplianceStatus>()?,
        reasoning: row.get("reasoning"),
        feedback: row.get("feedback"),
        improvement_suggestions: row.get("improvement_suggestions"),
        audited_at: parse_time(row.get("audited_at"))?,
        audited_by: audited_by.as_deref().map(parse_db_id).transpose()?,
        overlay,
    })
}

/// Insert or replace the result for `result.clause_id`
///
/// The overlay columns are reset: a fresh analysis needs a fresh verdict.
pub async fn upsert_result(pool: &SqlitePool, result: &AuditResult) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_results (
            id, clause_id, score, status, reasoning, feedback, improvement_suggestions,
            audited_at, audited_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(clause_id) DO UPDATE SET
            id = excluded.id,
            score = excluded.score,
            status = excluded.status,
            reasoning = excluded.reasoning,
            feedback = excluded.feedback,
            improvement_suggestions = excluded.improvement_suggestions,
            audited_at = excluded.audited_at,
            audited_by = excluded.audited_by,
            auditor_status = NULL,
            auditor_notes = NULL,
            agreed_date = NULL,
            assessed_at = NULL,
            assessed_by = NULL
        "#,
    )
    .bind(result.id.to_string())
    .bind(result.clause_id.to_string())
    .bind(result.score)
    .bind(result.status.as_str())
    .bind(&result.reasoning)
    .bind(&result.feedback)
    .bind(&result.improvement_suggestions)
    .bind(format_time(result.audited_at))
    .bind(result.audited_by.map(|id| id.to_string()))
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_result_for_clause(pool: &SqlitePool, clause_id: Uuid) -> Result<Option<AuditResult>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM audit_results WHERE clause_id = ?",
        RESULT_COLUMNS
    ))
    .bind(clause_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_result).transpose()
}

pub async fn list_results(pool: &SqlitePool) -> Result<Vec<AuditResult>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM audit_results ORDER BY audited_at",
        RESULT_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_result).collect()
}

/// Write the overlay onto an existing result; `false` when none exists
pub async fn set_overlay(pool: &SqlitePool, clause_id: Uuid, overlay: &AuditorOverlay) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE audit_results SET
            auditor_status = ?,
            auditor_notes = ?,
            agreed_date = ?,
            assessed_at = ?,
            assessed_by = ?
        WHERE clause_id = ?
        "#,
    )
    .bind(overlay.auditor_status.as_str())
    .bind(&overlay.auditor_notes)
    .bind(overlay.agreed_date.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(format_time(overlay.auditor_assessed_at))
    .bind(overlay.auditor_assessed_by.to_string())
    .bind(clause_id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_result_for_clause(pool: &SqlitePool, clause_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM audit_results WHERE clause_id = ?")
        .bind(clause_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_all_results(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM audit_results").execute(pool).await?;
    Ok(result.rows_affected())
}
