//! Authentication primitives shared by smk3 services
//!
//! Pure functions and types only; axum middleware is in smk3-audit.

pub mod auth;
pub mod types;

pub use auth::{
    hash_password, issue_token, load_or_initialize_token_secret, verify_password, verify_token,
};
pub use types::{Role, TokenClaims};
