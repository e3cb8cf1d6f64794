//! Bearer tokens and password hashes
//!
//! # Token format
//!
//! `base64url(claims JSON) "." hex(SHA-256(canonical claims JSON + secret))`
//!
//! The signature covers the canonical (sorted-key, no whitespace) form of the
//! claims so it does not depend on field order in the encoded payload.
//!
//! # Passwords
//!
//! Stored as bcrypt hashes (cost 12). Hashing and verification run on the
//! blocking pool so request workers are not stalled.
//!
//! Apart from the secret bootstrap, this module has no HTTP or database
//! dependencies. Middleware lives in smk3-audit.

use super::types::{Role, TokenClaims};
use crate::db::{get_setting, set_setting};
use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

const TOKEN_SECRET_KEY: &str = "token_secret";

// ========================================
// Secret Management
// ========================================

/// Load the token signing secret, generating and persisting one on first use
pub async fn load_or_initialize_token_secret(db: &SqlitePool) -> Result<String> {
    if let Some(secret) = get_setting(db, TOKEN_SECRET_KEY).await? {
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    let secret = random_hex(32);
    set_setting(db, TOKEN_SECRET_KEY, &secret).await?;
    info!("Generated new token signing secret");
    Ok(secret)
}

/// `len` random bytes as lowercase hex
pub fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ========================================
// Passwords
// ========================================

/// bcrypt work factor for stored passwords
pub const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// bcrypt hash of a password (salt is embedded in the hash string)
///
/// Runs on the blocking pool; one hash takes a noticeable fraction of a second.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_COST))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// A malformed stored hash never matches.
pub async fn verify_password(password: &str, stored_hash: &str) -> bool {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored_hash)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            warn!("Unreadable password hash: {}", e);
            false
        }
        Err(e) => {
            warn!("Password verification task failed: {}", e);
            false
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ========================================
// Tokens
// ========================================

/// Issue a signed token for a user, valid until `expires_at`
pub fn issue_token(user_id: Uuid, role: Role, expires_at: DateTime<Utc>, secret: &str) -> Result<String> {
    let claims = TokenClaims {
        sub: user_id,
        role,
        exp: expires_at.timestamp(),
    };
    let value = serde_json::to_value(&claims)
        .map_err(|e| Error::Internal(format!("Failed to encode token claims: {}", e)))?;

    let payload = URL_SAFE_NO_PAD.encode(value.to_string());
    let signature = calculate_signature(&value, secret);
    Ok(format!("{}.{}", payload, signature))
}

/// Verify signature and expiry, returning the claims
pub fn verify_token(token: &str, secret: &str, now: DateTime<Utc>) -> Result<TokenClaims> {
    let (payload, signature) = token
        .split_once('.')
        .ok_or_else(|| Error::Token("Malformed token".to_string()))?;

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| Error::Token("Malformed token payload".to_string()))?;
    let value: Value = serde_json::from_slice(&decoded)
        .map_err(|_| Error::Token("Malformed token payload".to_string()))?;

    let expected = calculate_signature(&value, secret);
    if !constant_time_eq(expected.as_bytes(), signature.as_bytes()) {
        return Err(Error::Token("Invalid token signature".to_string()));
    }

    let claims: TokenClaims = serde_json::from_value(value)
        .map_err(|_| Error::Token("Invalid token claims".to_string()))?;

    if claims.exp <= now.timestamp() {
        return Err(Error::Token("Token expired".to_string()));
    }

    Ok(claims)
}

/// SHA-256 of canonical claims JSON followed by the secret, as 64 hex chars
pub fn calculate_signature(claims: &Value, secret: &str) -> String {
    sha256_hex(&format!("{}{}", to_canonical_json(claims), secret))
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// # Examples
///
/// ```
/// use smk3_common::api::auth::to_canonical_json;
/// use serde_json::json;
///
/// let json = json!({"z": 3, "a": 1, "m": 2});
/// assert_eq!(to_canonical_json(&json), r#"{"a":1,"m":2,"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

// ========================================
// Tests
// ========================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const SECRET: &str = "unit-test-secret";

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("rahasia123").await.unwrap();
        assert!(verify_password("rahasia123", &hash).await);
        assert!(!verify_password("rahasia124", &hash).await);
    }

    #[tokio::test]
    async fn test_password_hash_is_salted_bcrypt() {
        let first = hash_password("sama").await.unwrap();
        let second = hash_password("sama").await.unwrap();

        assert!(first.starts_with("$2b$12$"), "{}", first);
        assert_ne!(first, second);
        assert!(!first.contains("sama"));
    }

    #[tokio::test]
    async fn test_malformed_stored_hash_never_matches() {
        assert!(!verify_password("rahasia", "").await);
        assert!(!verify_password("rahasia", "rahasia").await);
        let sha256_digest = sha256_hex("salt:rahasia");
        assert!(!verify_password("rahasia", &sha256_digest).await);
    }

    #[test]
    fn test_token_round_trip() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let token = issue_token(user, Role::Auditor, now + Duration::hours(1), SECRET).unwrap();

        let claims = verify_token(&token, SECRET, now).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.role, Role::Auditor);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now();
        let token = issue_token(Uuid::new_v4(), Role::Admin, now - Duration::seconds(1), SECRET).unwrap();
        assert!(matches!(verify_token(&token, SECRET, now), Err(Error::Token(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = Utc::now();
        let token = issue_token(Uuid::new_v4(), Role::Admin, now + Duration::hours(1), SECRET).unwrap();
        assert!(verify_token(&token, "other-secret", now).is_err());
    }

    #[test]
    fn test_tampered_role_rejected() {
        let now = Utc::now();
        let user = Uuid::new_v4();
        let token = issue_token(user, Role::Auditee, now + Duration::hours(1), SECRET).unwrap();
        let signature = token.split_once('.').unwrap().1;

        let forged_claims = json!({"sub": user, "role": "admin", "exp": (now + Duration::hours(1)).timestamp()});
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode(forged_claims.to_string()), signature);

        assert!(verify_token(&forged, SECRET, now).is_err());
    }

    #[test]
    fn test_garbage_tokens_rejected() {
        let now = Utc::now();
        assert!(verify_token("", SECRET, now).is_err());
        assert!(verify_token("no-dot-here", SECRET, now).is_err());
        assert!(verify_token("!!!.abc", SECRET, now).is_err());
    }

    #[test]
    fn test_canonical_json_escapes_strings() {
        let value = json!({"b": "say \"hi\"", "a": [1, null, true]});
        assert_eq!(to_canonical_json(&value), r#"{"a":[1,null,true],"b":"say \"hi\""}"#);
    }

    #[tokio::test]
    async fn test_token_secret_persists() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init_database(&dir.path().join("secret.db")).await.unwrap();

        let first = load_or_initialize_token_secret(&pool).await.unwrap();
        let second = load_or_initialize_token_secret(&pool).await.unwrap();

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
    }
}
