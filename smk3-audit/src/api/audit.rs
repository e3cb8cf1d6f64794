//! Clause analysis, results, auditor verdicts and the dashboard

use axum::{
    extract::State,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use smk3_common::api::Role;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use super::{blob_error, load_clause, require_role, CurrentUser};
use crate::models::{AuditResult, AuditorOverlay, Verdict};
use crate::services::aggregation::{aggregate, DashboardStats};
use crate::services::{parser, prompt};
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct AssessmentRequest {
    pub auditor_status: Verdict,
    pub auditor_notes: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    pub agreed_date: Option<String>,
}

/// POST /api/audit/analyze/:clause_id
pub async fn analyze_clause(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(clause_id): ApiPath<Uuid>,
) -> ApiResult<Json<AuditResult>> {
    let clause = load_clause(&state.db, clause_id).await?;

    let documents = db::documents::list_documents_for_clause(&state.db, clause_id).await?;
    if documents.is_empty() {
        return Err(ApiError::BadRequest(
            "No evidence documents uploaded for this clause".to_string(),
        ));
    }
    if clause.knowledge_base.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Knowledge base for this clause is empty; fill it in before analysis".to_string(),
        ));
    }

    let mut evidence = Vec::with_capacity(documents.len());
    for doc in documents {
        let content = state.blobs.get(&doc.blob_ref).await.map_err(|e| match blob_error(&doc.blob_ref, e) {
            ApiError::NotFound(msg) => ApiError::Upstream(msg),
            other => other,
        })?;
        evidence.push((doc, content));
    }

    info!(clause_id = %clause_id, documents = evidence.len(), "Analyzing clause {}", clause.clause_number);
    let request = prompt::build_request(&clause, evidence);
    let reply = state.model.analyze(&request).await.map_err(|e| {
        ApiError::Upstream(format!("AI analysis failed for clause {}: {}", clause.clause_number, e))
    })?;

    let parsed = parser::parse_reply(&reply);
    let result = AuditResult {
        id: Uuid::new_v4(),
        clause_id,
        score: parsed.score,
        status: parsed.status,
        reasoning: parsed.reasoning,
        feedback: parsed.feedback,
        improvement_suggestions: parsed.improvement_suggestions,
        audited_at: smk3_common::time::now(),
        audited_by: Some(user.0.id),
        overlay: None,
    };
    db::results::upsert_result(&state.db, &result).await?;

    info!(
        clause_id = %clause_id,
        score = result.score,
        status = result.status.as_str(),
        "Stored analysis for clause {}",
        clause.clause_number
    );
    Ok(Json(result))
}

/// GET /api/audit/results
pub async fn list_results(State(state): State<AppState>) -> ApiResult<Json<Vec<AuditResult>>> {
    Ok(Json(db::results::list_results(&state.db).await?))
}

/// GET /api/audit/results/:clause_id (`null` when not analyzed yet)
pub async fn get_result(
    State(state): State<AppState>,
    ApiPath(clause_id): ApiPath<Uuid>,
) -> ApiResult<Json<Option<AuditResult>>> {
    Ok(Json(db::results::get_result_for_clause(&state.db, clause_id).await?))
}

fn parse_agreed_date(value: Option<&str>) -> ApiResult<Option<chrono::NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => smk3_common::time::parse_timestamp(v)
            .map(|t| Some(t.date_naive()))
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid agreed_date '{}'", v))),
    }
}

/// PUT /api/audit/results/:clause_id/auditor-assessment (auditor)
///
/// Replaces any earlier verdict; the AI fields are left untouched.
pub async fn submit_assessment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(clause_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<AssessmentRequest>,
) -> ApiResult<Json<AuditResult>> {
    require_role(&user, &[Role::Auditor])?;

    let overlay = AuditorOverlay {
        auditor_status: payload.auditor_status,
        auditor_notes: payload.auditor_notes.filter(|n| !n.trim().is_empty()),
        agreed_date: parse_agreed_date(payload.agreed_date.as_deref())?,
        auditor_assessed_at: smk3_common::time::now(),
        auditor_assessed_by: user.0.id,
    };

    if !db::results::set_overlay(&state.db, clause_id, &overlay).await? {
        return Err(ApiError::NotFound(format!(
            "No audit result for clause {}; run the analysis first",
            clause_id
        )));
    }

    info!(
        clause_id = %clause_id,
        verdict = overlay.auditor_status.as_str(),
        "Auditor assessment recorded by {}",
        user.0.email
    );

    db::results::get_result_for_clause(&state.db, clause_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No audit result for clause {}", clause_id)))
}

/// GET /api/audit/dashboard
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardStats>> {
    let criteria = db::criteria::list_criteria(&state.db).await?;
    let clauses = db::clauses::list_clauses(&state.db, None).await?;
    let results = db::results::list_results(&state.db).await?;
    Ok(Json(aggregate(&criteria, &clauses, &results)))
}

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audit/analyze/:clause_id", post(analyze_clause))
        .route("/api/audit/results", get(list_results))
        .route("/api/audit/results/:clause_id", get(get_result))
        .route(
            "/api/audit/results/:clause_id/auditor-assessment",
            put(submit_assessment),
        )
        .route("/api/audit/dashboard", get(dashboard))
}
