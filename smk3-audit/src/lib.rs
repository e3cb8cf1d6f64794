//! smk3-audit library - SMK3 compliance audit service
//!
//! Evidence uploads per clause, model-assisted analysis, auditor verdicts,
//! dashboard aggregation, recommendations, PDF reports and evidence exports.

use axum::http::HeaderValue;
use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::services::blob_store::BlobStore;
use crate::services::llm::AuditModel;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Evidence file store
    pub blobs: BlobStore,
    /// Model used for clause analysis
    pub model: Arc<dyn AuditModel>,
    /// Bearer token signing secret
    pub token_secret: String,
    pub token_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        blobs: BlobStore,
        model: Arc<dyn AuditModel>,
        token_secret: String,
        token_ttl: chrono::Duration,
    ) -> Self {
        Self {
            db,
            blobs,
            model,
            token_secret,
            token_ttl,
        }
    }
}

/// Build application router
///
/// `/health`, `/api/`, `/api/buildinfo`, register and login are public;
/// everything else requires a bearer token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;

    let protected = Router::new()
        .merge(api::user_routes())
        .merge(api::criteria_routes())
        .merge(api::clause_routes())
        .merge(api::document_routes())
        .merge(api::audit_routes())
        .merge(api::export_routes())
        .merge(api::recommendation_routes())
        .merge(api::report_routes())
        .merge(api::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    let public = Router::new()
        .merge(api::health_routes())
        .merge(api::public_auth_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(values))
}
