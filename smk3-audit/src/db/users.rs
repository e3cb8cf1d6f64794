//! User accounts

use super::{format_time, parse_db_id, parse_time};
use crate::models::User;
use smk3_common::api::{hash_password, Role};
use smk3_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored password hash for a user
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

fn map_user(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    Ok(User {
        id: parse_db_id(row.get("id"))?,
        email: row.get("email"),
        name: row.get("name"),
        role: role.parse()?,
        created_at: parse_time(row.get("created_at"))?,
    })
}

/// Register a user; fails with InvalidInput when the email is taken
pub async fn create_user(
    pool: &SqlitePool,
    email: &str,
    name: &str,
    role: Role,
    password: &str,
) -> Result<User> {
    let email = email.trim().to_lowercase();
    if email_exists(pool, &email).await? {
        return Err(Error::InvalidInput("Email already registered".to_string()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        name: name.trim().to_string(),
        role,
        created_at: smk3_common::time::now(),
    };
    let password_hash = hash_password(password).await?;

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, role, password_hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.name)
    .bind(user.role.as_str())
    .bind(password_hash)
    .bind(format_time(user.created_at))
    .execute(pool)
    .await?;

    Ok(user)
}

async fn email_exists(pool: &SqlitePool, email: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Load a user together with the stored password hash
pub async fn find_credentials(pool: &SqlitePool, email: &str) -> Result<Option<Credentials>> {
    let row = sqlx::query(
        r#"
        SELECT id, email, name, role, created_at, password_hash
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(email.trim().to_lowercase())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(Credentials {
            user: map_user(&row)?,
            password_hash: row.get("password_hash"),
        })),
        None => Ok(None),
    }
}

pub async fn get_user(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query("SELECT id, email, name, role, created_at FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_user).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use smk3_common::api::verify_password;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (_dir, pool) = test_pool().await;

        let user = create_user(&pool, " Auditor@PLN.co.id ", "Budi", Role::Auditor, "secret")
            .await
            .unwrap();
        assert_eq!(user.email, "auditor@pln.co.id");

        let creds = find_credentials(&pool, "AUDITOR@pln.co.id").await.unwrap().unwrap();
        assert_eq!(creds.user.id, user.id);
        assert!(creds.password_hash.starts_with("$2b$"));
        assert!(verify_password("secret", &creds.password_hash).await);

        let loaded = get_user(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(loaded.role, Role::Auditor);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (_dir, pool) = test_pool().await;
        create_user(&pool, "a@x.id", "A", Role::Admin, "pw").await.unwrap();

        let err = create_user(&pool, "A@x.id", "B", Role::Auditee, "pw").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
