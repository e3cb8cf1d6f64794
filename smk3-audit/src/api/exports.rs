//! Bulk evidence archives organized by criterion and clause

use axum::{
    extract::State,
    response::Response,
    routing::get,
    Router,
};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::extract::ApiPath;
use super::{file_response, load_criterion, Disposition};
use crate::models::{Clause, Criterion, EvidenceDocument};
use crate::services::archive;
use crate::{db, ApiError, ApiResult, AppState};

/// Pair each document with its `criterion/clause` folder; orphans are dropped
fn folder_items(
    criteria: &[Criterion],
    clauses: &[Clause],
    documents: Vec<EvidenceDocument>,
) -> Vec<(String, EvidenceDocument)> {
    let criteria: HashMap<Uuid, &Criterion> = criteria.iter().map(|c| (c.id, c)).collect();
    let clauses: HashMap<Uuid, &Clause> = clauses.iter().map(|c| (c.id, c)).collect();

    documents
        .into_iter()
        .filter_map(|doc| {
            let clause = clauses.get(&doc.clause_id)?;
            let criterion = criteria.get(&clause.criteria_id)?;
            let folder = format!(
                "{}/{}",
                archive::criterion_folder(criterion),
                archive::clause_folder(clause)
            );
            Some((folder, doc))
        })
        .collect()
}

async fn archive_response(
    state: &AppState,
    items: Vec<(String, EvidenceDocument)>,
    filename: &str,
) -> ApiResult<Response> {
    let entries = archive::gather_entries(&state.blobs, items).await;
    if entries.is_empty() {
        return Err(ApiError::NotFound("No evidence files to export".to_string()));
    }

    let zip = archive::build_zip(&entries)
        .map_err(|e| ApiError::Internal(format!("Failed to build archive: {}", e)))?;
    info!(files = entries.len(), bytes = zip.len(), "Built evidence archive {}", filename);
    Ok(file_response(zip, "application/zip", Disposition::Attachment, filename))
}

/// GET /api/audit/download-all-evidence
pub async fn download_all_evidence(State(state): State<AppState>) -> ApiResult<Response> {
    let criteria = db::criteria::list_criteria(&state.db).await?;
    let clauses = db::clauses::list_clauses(&state.db, None).await?;
    let documents = db::documents::list_all_documents(&state.db).await?;

    let filename = format!(
        "All_Evidence_SMK3_PLTU_Tenayan_{}.zip",
        smk3_common::time::file_stamp(smk3_common::time::now())
    );
    archive_response(&state, folder_items(&criteria, &clauses, documents), &filename).await
}

/// GET /api/audit/download-criteria-evidence/:criteria_id
pub async fn download_criteria_evidence(
    State(state): State<AppState>,
    ApiPath(criteria_id): ApiPath<Uuid>,
) -> ApiResult<Response> {
    let criterion = load_criterion(&state.db, criteria_id).await?;
    let clauses = db::clauses::list_clauses(&state.db, Some(criteria_id)).await?;
    let documents = db::documents::list_documents_for_criterion(&state.db, criteria_id).await?;

    let name: String = archive::sanitize(&criterion.name)
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let filename = format!(
        "Evidence_Kriteria_{}_{}_{}.zip",
        criterion.order,
        name,
        smk3_common::time::file_stamp(smk3_common::time::now())
    );
    let items = folder_items(std::slice::from_ref(&criterion), &clauses, documents);
    archive_response(&state, items, &filename).await
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audit/download-all-evidence", get(download_all_evidence))
        .route(
            "/api/audit/download-criteria-evidence/:criteria_id",
            get(download_criteria_evidence),
        )
}
