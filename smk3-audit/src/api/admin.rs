//! Admin operations: catalog seeding and hard reset

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use smk3_common::api::Role;
use tracing::{info, warn};

use super::{remove_blobs, require_role, CurrentUser};
use crate::services::catalog::{seed_catalog, SeedSummary};
use crate::{db, ApiResult, AppState};

#[derive(Debug, Serialize)]
pub struct DeletedCounts {
    pub files: usize,
    pub documents: u64,
    pub audit_results: u64,
    pub recommendations: u64,
}

#[derive(Debug, Serialize)]
pub struct HardResetResponse {
    pub message: String,
    pub deleted: DeletedCounts,
}

/// POST /api/seed-data (admin)
pub async fn seed_data(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SeedSummary>> {
    require_role(&user, &[Role::Admin])?;
    Ok(Json(seed_catalog(&state.db).await?))
}

/// POST /api/audit/hard-reset (admin)
///
/// Removes every evidence file, document row, audit result and
/// recommendation. The catalog and user accounts stay.
pub async fn hard_reset(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<HardResetResponse>> {
    require_role(&user, &[Role::Admin])?;
    warn!("Hard reset requested by {}", user.0.email);

    let documents = db::documents::list_all_documents(&state.db).await?;
    let files = remove_blobs(&state.blobs, documents.into_iter().map(|d| d.blob_ref).collect()).await;

    let deleted = DeletedCounts {
        files,
        documents: db::documents::delete_all_documents(&state.db).await?,
        audit_results: db::results::delete_all_results(&state.db).await?,
        recommendations: db::recommendations::delete_all_recommendations(&state.db).await?,
    };

    info!(
        files = deleted.files,
        documents = deleted.documents,
        audit_results = deleted.audit_results,
        recommendations = deleted.recommendations,
        "Hard reset completed"
    );

    Ok(Json(HardResetResponse {
        message: "Hard reset completed successfully".to_string(),
        deleted,
    }))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/api/seed-data", post(seed_data))
        .route("/api/audit/hard-reset", post(hard_reset))
}
