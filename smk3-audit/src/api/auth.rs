//! Bearer-token authentication and role checks
//!
//! Protected routes run `auth_middleware`, which resolves the
//! `Authorization: Bearer <token>` header to the stored user and attaches it
//! to the request as a `CurrentUser` extension.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use smk3_common::api::{verify_token, Role};
use tracing::debug;

use crate::models::User;
use crate::{db, ApiError, ApiResult, AppState};

/// Authenticated caller, available to handlers via `Extension<CurrentUser>`
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn role(&self) -> Role {
        self.0.role
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;

    let claims = verify_token(token, &state.token_secret, smk3_common::time::now())
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    // Tokens outlive deleted accounts; the user row is authoritative
    let user = db::users::get_user(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;

    debug!(user_id = %user.id, role = %user.role, "Authenticated request");
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Fail with 403 unless the caller holds one of `allowed`
pub fn require_role(user: &CurrentUser, allowed: &[Role]) -> ApiResult<()> {
    if allowed.contains(&user.role()) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Role '{}' is not permitted to perform this operation",
            user.role()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(role: Role) -> CurrentUser {
        CurrentUser(User {
            id: Uuid::new_v4(),
            email: "a@b.id".to_string(),
            name: "A".to_string(),
            role,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer xyz"));
        assert_eq!(bearer_token(&headers), Some("xyz"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(Role::Admin), &[Role::Admin]).is_ok());
        assert!(require_role(&user(Role::Auditor), &[Role::Admin, Role::Auditor]).is_ok());
        assert!(matches!(
            require_role(&user(Role::Auditee), &[Role::Auditor]),
            Err(ApiError::Forbidden(_))
        ));
    }
}
