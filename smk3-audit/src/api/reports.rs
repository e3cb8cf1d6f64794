//! PDF report generation

use axum::{extract::State, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tracing::info;

use crate::services::aggregation::aggregate;
use crate::services::report::{render_report, report_filename};
use crate::{db, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub filename: String,
    /// Base64 of the PDF bytes
    pub content: String,
    pub content_type: &'static str,
}

/// POST /api/reports/generate
pub async fn generate_report(State(state): State<AppState>) -> ApiResult<Json<ReportResponse>> {
    let criteria = db::criteria::list_criteria(&state.db).await?;
    let clauses = db::clauses::list_clauses(&state.db, None).await?;
    let results = db::results::list_results(&state.db).await?;

    let stats = aggregate(&criteria, &clauses, &results);
    let now = smk3_common::time::now();
    let pdf = render_report(&stats, &clauses, &results, now);
    let filename = report_filename(now);

    info!(bytes = pdf.len(), results = results.len(), "Generated report {}", filename);
    Ok(Json(ReportResponse {
        filename,
        content: STANDARD.encode(pdf),
        content_type: "application/pdf",
    }))
}

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/reports/generate", post(generate_report))
}
