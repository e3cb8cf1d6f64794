//! Clause endpoints, including knowledge base edits

use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use smk3_common::api::Role;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{load_clause, load_criterion, remove_blobs, require_role, CurrentUser};
use crate::models::Clause;
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ClauseQuery {
    pub criteria_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateClauseRequest {
    pub criteria_id: Uuid,
    pub clause_number: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub knowledge_base: String,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeBaseRequest {
    pub knowledge_base: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteClauseResponse {
    pub message: String,
    pub deleted_documents: usize,
}

/// GET /api/clauses?criteria_id=
pub async fn list_clauses(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClauseQuery>,
) -> ApiResult<Json<Vec<Clause>>> {
    Ok(Json(db::clauses::list_clauses(&state.db, query.criteria_id).await?))
}

/// GET /api/clauses/:id
pub async fn get_clause(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> ApiResult<Json<Clause>> {
    Ok(Json(load_clause(&state.db, id).await?))
}

/// POST /api/clauses (admin)
pub async fn create_clause(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateClauseRequest>,
) -> ApiResult<Json<Clause>> {
    require_role(&user, &[Role::Admin])?;

    let number = payload.clause_number.trim();
    if number.is_empty() || payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Clause number and title are required".to_string()));
    }

    load_criterion(&state.db, payload.criteria_id).await?;
    if db::clauses::clause_number_exists(&state.db, payload.criteria_id, number).await? {
        return Err(ApiError::Conflict(format!(
            "Clause {} already exists in this criterion",
            number
        )));
    }

    let clause = db::clauses::create_clause(
        &state.db,
        payload.criteria_id,
        number,
        payload.title.trim(),
        &payload.description,
        &payload.knowledge_base,
    )
    .await?;
    info!(clause_id = %clause.id, "Created clause {}", clause.clause_number);
    Ok(Json(clause))
}

/// PUT /api/clauses/:id/knowledge-base (admin, auditor)
pub async fn update_knowledge_base(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<KnowledgeBaseRequest>,
) -> ApiResult<Json<Clause>> {
    require_role(&user, &[Role::Admin, Role::Auditor])?;

    if !db::clauses::update_knowledge_base(&state.db, id, &payload.knowledge_base).await? {
        return Err(ApiError::NotFound(format!("Clause {} not found", id)));
    }
    info!(clause_id = %id, "Knowledge base updated by {}", user.0.email);
    Ok(Json(load_clause(&state.db, id).await?))
}

/// DELETE /api/clauses/:id (admin)
pub async fn delete_clause(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeleteClauseResponse>> {
    require_role(&user, &[Role::Admin])?;
    let clause = load_clause(&state.db, id).await?;

    let documents = db::documents::list_documents_for_clause(&state.db, id).await?;
    db::clauses::delete_clause(&state.db, id).await?;
    let blob_refs: Vec<String> = documents.iter().map(|d| d.blob_ref.clone()).collect();
    remove_blobs(&state.blobs, blob_refs).await;

    info!(clause_id = %id, documents = documents.len(), "Deleted clause {}", clause.clause_number);
    Ok(Json(DeleteClauseResponse {
        message: "Clause deleted".to_string(),
        deleted_documents: documents.len(),
    }))
}

pub fn clause_routes() -> Router<AppState> {
    Router::new()
        .route("/api/clauses", get(list_clauses).post(create_clause))
        .route("/api/clauses/:id", get(get_clause).delete(delete_clause))
        .route("/api/clauses/:id/knowledge-base", put(update_knowledge_base))
}
