//! Criteria persistence

use super::{format_time, parse_db_id, parse_time};
use crate::models::Criterion;
use smk3_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn map_criterion(row: &SqliteRow) -> Result<Criterion> {
    Ok(Criterion {
        id: parse_db_id(row.get("id"))?,
        name: row.get("name"),
        description: row.get("description"),
        order: row.get("display_order"),
        created_at: parse_time(row.get("created_at"))?,
    })
}

/// All criteria sorted by display order
pub async fn list_criteria(pool: &SqlitePool) -> Result<Vec<Criterion>> {
    let rows = sqlx::query(
        "SELECT id, name, description, display_order, created_at FROM criteria ORDER BY display_order, rowid",
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_criterion).collect()
}

pub async fn get_criterion(pool: &SqlitePool, id: Uuid) -> Result<Option<Criterion>> {
    let row = sqlx::query(
        "SELECT id, name, description, display_order, created_at FROM criteria WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(map_criterion).transpose()
}

pub async fn create_criterion(
    pool: &SqlitePool,
    name: &str,
    description: &str,
    order: i64,
) -> Result<Criterion> {
    let criterion = Criterion {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.to_string(),
        order,
        created_at: smk3_common::time::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO criteria (id, name, description, display_order, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(criterion.id.to_string())
    .bind(&criterion.name)
    .bind(&criterion.description)
    .bind(criterion.order)
    .bind(format_time(criterion.created_at))
    .execute(pool)
    .await?;

    Ok(criterion)
}

/// Replace name, description and order; `None` when the criterion is unknown
pub async fn update_criterion(
    pool: &SqlitePool,
    id: Uuid,
    name: &str,
    description: &str,
    order: i64,
) -> Result<Option<Criterion>> {
    let result = sqlx::query(
        "UPDATE criteria SET name = ?, description = ?, display_order = ? WHERE id = ?",
    )
    .bind(name)
    .bind(description)
    .bind(order)
    .bind(id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    get_criterion(pool, id).await
}

/// Delete a criterion; clauses, documents and results go with it via cascade
pub async fn delete_criterion(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM criteria WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_criteria(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM criteria")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[tokio::test]
    async fn test_list_sorted_by_order() {
        let (_dir, pool) = test_pool().await;
        create_criterion(&pool, "Kedua", "", 2).await.unwrap();
        create_criterion(&pool, "Pertama", "", 1).await.unwrap();

        let names: Vec<String> = list_criteria(&pool).await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Pertama", "Kedua"]);
        assert_eq!(count_criteria(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_dir, pool) = test_pool().await;
        let c = create_criterion(&pool, "Lama", "d", 1).await.unwrap();

        let updated = update_criterion(&pool, c.id, "Baru", "d2", 3).await.unwrap().unwrap();
        assert_eq!(updated.name, "Baru");
        assert_eq!(updated.order, 3);

        assert!(update_criterion(&pool, Uuid::new_v4(), "x", "", 1).await.unwrap().is_none());
        assert!(delete_criterion(&pool, c.id).await.unwrap());
        assert!(!delete_criterion(&pool, c.id).await.unwrap());
    }
}
