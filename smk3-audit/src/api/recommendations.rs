//! Recommendation endpoints and deadline notifications

use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use smk3_common::api::Role;
use smk3_common::time::parse_timestamp;
use tracing::info;
use uuid::Uuid;

use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::{load_clause, require_role, CurrentUser};
use crate::models::{Recommendation, RecommendationStatus};
use crate::services::recommendations::{
    build_notifications, completion_time, transition_allowed, Notification,
};
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CreateRecommendationRequest {
    pub clause_id: Uuid,
    pub recommendation_text: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub deadline: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub clause_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRecommendationRequest {
    pub status: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

fn parse_time_field(name: &str, value: &str) -> ApiResult<chrono::DateTime<chrono::Utc>> {
    parse_timestamp(value).ok_or_else(|| ApiError::BadRequest(format!("Invalid {} '{}'", name, value)))
}

/// POST /api/recommendations (auditor)
pub async fn create_recommendation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    ApiJson(payload): ApiJson<CreateRecommendationRequest>,
) -> ApiResult<Json<Recommendation>> {
    require_role(&user, &[Role::Auditor])?;

    if payload.recommendation_text.trim().is_empty() {
        return Err(ApiError::BadRequest("Recommendation text cannot be empty".to_string()));
    }
    let deadline = parse_time_field("deadline", &payload.deadline)?;
    load_clause(&state.db, payload.clause_id).await?;

    let rec = Recommendation {
        id: Uuid::new_v4(),
        clause_id: payload.clause_id,
        recommendation_text: payload.recommendation_text.trim().to_string(),
        deadline,
        status: RecommendationStatus::Pending,
        created_by: user.0.id,
        created_at: smk3_common::time::now(),
        completed_at: None,
    };
    db::recommendations::insert_recommendation(&state.db, &rec).await?;

    info!(recommendation_id = %rec.id, clause_id = %rec.clause_id, "Recommendation created");
    Ok(Json(rec))
}

/// GET /api/recommendations?clause_id=&status=
pub async fn list_recommendations(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecommendationQuery>,
) -> ApiResult<Json<Vec<Recommendation>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RecommendationStatus>)
        .transpose()?;
    Ok(Json(
        db::recommendations::list_recommendations(&state.db, query.clause_id, status).await?,
    ))
}

/// PUT /api/recommendations/:id
///
/// Status only moves forward; a backward move is a 409.
pub async fn update_recommendation(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateRecommendationRequest>,
) -> ApiResult<Json<Recommendation>> {
    let next: RecommendationStatus = payload.status.parse()?;
    let requested = payload
        .completed_at
        .as_deref()
        .map(|v| parse_time_field("completed_at", v))
        .transpose()?;

    let current = db::recommendations::get_recommendation(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Recommendation {} not found", id)))?;

    if !transition_allowed(current.status, next) {
        return Err(ApiError::Conflict(format!(
            "Cannot move recommendation from {} back to {}",
            current.status, next
        )));
    }

    let completed_at = completion_time(&current, next, requested, smk3_common::time::now());
    db::recommendations::update_status(&state.db, id, next, completed_at).await?;
    info!(recommendation_id = %id, from = %current.status, to = %next, "Recommendation status changed");

    db::recommendations::get_recommendation(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Recommendation {} not found", id)))
}

/// GET /api/recommendations/notifications
pub async fn notifications(State(state): State<AppState>) -> ApiResult<Json<NotificationsResponse>> {
    let open = db::recommendations::list_open_recommendations(&state.db).await?;
    let clauses = db::clauses::list_clauses(&state.db, None).await?;
    Ok(Json(NotificationsResponse {
        notifications: build_notifications(&open, &clauses, smk3_common::time::now()),
    }))
}

pub fn recommendation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/recommendations",
            get(list_recommendations).post(create_recommendation),
        )
        .route("/api/recommendations/notifications", get(notifications))
        .route("/api/recommendations/:id", put(update_recommendation))
}
