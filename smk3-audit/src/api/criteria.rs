//! Criteria endpoints

use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use smk3_common::api::Role;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath};
use super::{load_criterion, remove_blobs, require_role, CurrentUser};
use crate::models::Criterion;
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CriterionRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub order: i64,
}

impl CriterionRequest {
    fn validate(&self) -> ApiResult<()> {
        if self.name.trim().is_empty() {
            return Err(ApiError::BadRequest("Criterion name cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteCriterionResponse {
    pub message: String,
    pub deleted_clauses: usize,
    pub deleted_documents: usize,
}

/// GET /api/criteria
pub async fn list_criteria(State(state): State<AppState>) -> ApiResult<Json<Vec<Criterion>>> {
    Ok(Json(db::criteria::list_criteria(&state.db).await?))
}

/// POST /api/criteria (admin)
pub async fn create_criterion(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CriterionRequest>,
) -> ApiResult<Json<Criterion>> {
    require_role(&user, &[Role::Admin])?;
    payload.validate()?;

    let criterion = db::criteria::create_criterion(
        &state.db,
        payload.name.trim(),
        &payload.description,
        payload.order,
    )
    .await?;
    info!(criterion_id = %criterion.id, "Created criterion {}", criterion.name);
    Ok(Json(criterion))
}

/// PUT /api/criteria/:id (admin)
pub async fn update_criterion(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CriterionRequest>,
) -> ApiResult<Json<Criterion>> {
    require_role(&user, &[Role::Admin])?;
    payload.validate()?;

    db::criteria::update_criterion(&state.db, id, payload.name.trim(), &payload.description, payload.order)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Criterion {} not found", id)))
}

/// DELETE /api/criteria/:id (admin)
///
/// Clauses, documents and results cascade with the row. Recommendations are
/// kept.
pub async fn delete_criterion(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteCriterionResponse>> {
    require_role(&user, &[Role::Admin])?;
    let criterion = load_criterion(&state.db, id).await?;

    let clauses = db::clauses::list_clauses(&state.db, Some(id)).await?;
    let documents = db::documents::list_documents_for_criterion(&state.db, id).await?;

    db::criteria::delete_criterion(&state.db, id).await?;
    let blob_refs: Vec<String> = documents.iter().map(|d| d.blob_ref.clone()).collect();
    remove_blobs(&state.blobs, blob_refs).await;

    info!(
        criterion_id = %id,
        clauses = clauses.len(),
        documents = documents.len(),
        "Deleted criterion {}",
        criterion.name
    );

    Ok(Json(DeleteCriterionResponse {
        message: "Criterion deleted".to_string(),
        deleted_clauses: clauses.len(),
        deleted_documents: documents.len(),
    }))
}

pub fn criteria_routes() -> Router<AppState> {
    Router::new()
        .route("/api/criteria", get(list_criteria).post(create_criterion))
        .route("/api/criteria/:id", axum::routing::put(update_criterion).delete(delete_criterion))
}
