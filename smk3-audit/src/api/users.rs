//! Registration, login and the current-user endpoint

use axum::{extract::State, routing::{get, post}, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use smk3_common::api::{issue_token, verify_password, Role};
use tracing::{info, warn};

use super::extract::ApiJson;
use super::auth::CurrentUser;
use crate::models::User;
use crate::{db, ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    /// Defaults to auditee
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

fn token_response(state: &AppState, user: User) -> ApiResult<Json<TokenResponse>> {
    let expires_at = smk3_common::time::now() + state.token_ttl;
    let access_token = issue_token(user.id, user.role, expires_at, &state.token_secret)?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
        user,
    }))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if !payload.email.contains('@') {
        return Err(ApiError::BadRequest("A valid email address is required".to_string()));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::BadRequest("Password cannot be empty".to_string()));
    }

    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::Auditee,
    };

    let user = db::users::create_user(&state.db, &payload.email, &payload.name, role, &payload.password).await?;
    info!(user_id = %user.id, role = %user.role, "Registered user {}", user.email);

    token_response(&state, user)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let credentials = db::users::find_credentials(&state.db, &payload.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&payload.password, &credentials.password_hash).await {
        warn!("Failed login for {}", credentials.user.email);
        return Err(invalid());
    }

    token_response(&state, credentials.user)
}

/// GET /api/auth/me
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<User> {
    Json(user.0)
}

/// Routes reachable without a token
pub fn public_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/api/auth/me", get(me))
}
