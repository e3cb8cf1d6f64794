//! Clause persistence

use super::{format_time, parse_db_id, parse_time};
use crate::models::Clause;
use smk3_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const CLAUSE_COLUMNS: &str =
    "c.id, c.criterion_id, c.clause_number, c.title, c.description, c.knowledge_base, c.created_at";

fn map_clause(row: &SqliteRow) -> Result<Clause> {
    Ok(Clause {
        id: parse_db_id(row.get("id"))?,
        criteria_id: parse_db_id(row.get("criterion_id"))?,
        clause_number: row.get("clause_number"),
        title: row.get("title"),
        description: row.get("description"),
        knowledge_base: row.get("knowledge_base"),
        created_at: parse_time(row.get("created_at"))?,
    })
}

/// Clauses in catalog order, optionally restricted to one criterion
pub async fn list_clauses(pool: &SqlitePool, criteria_id: Option<Uuid>) -> Result<Vec<Clause>> {
    let rows = match criteria_id {
        Some(criteria_id) => {
            sqlx::query(&format!(
                "SELECT {} FROM clauses c WHERE c.criterion_id = ? ORDER BY c.rowid",
                CLAUSE_COLUMNS
            ))
            .bind(criteria_id.to_string())
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(&format!(
                r#"
                SELECT {} FROM clauses c
                JOIN criteria k ON k.id = c.criterion_id
                ORDER BY k.display_order, c.rowid
                "#,
                CLAUSE_COLUMNS
            ))
            .fetch_all(pool)
            .await?
        }
    };

    rows.iter().map(map_clause).collect()
}

pub async fn get_clause(pool: &SqlitePool, id: Uuid) -> Result<Option<Clause>> {
    let row = sqlx::query(&format!("SELECT {} FROM clauses c WHERE c.id = ?", CLAUSE_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(map_clause).transpose()
}

/// Whether `clause_number` is already used inside the criterion
pub async fn clause_number_exists(
    pool: &SqlitePool,
    criteria_id: Uuid,
    clause_number: &str,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM clauses WHERE criterion_id = ? AND clause_number = ?",
    )
    .bind(criteria_id.to_string())
    .bind(clause_number)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

pub async fn create_clause(
    pool: &SqlitePool,
    criteria_id: Uuid,
    clause_number: &str,
    title: &str,
    description: &str,
    knowledge_base: &str,
) -> Result<Clause> {
    let clause = Clause {
        id: Uuid::new_v4(),
        criteria_id,
        clause_number: clause_number.trim().to_string(),
        title: title.to_string(),
        description: description.to_string(),
        knowledge_base: knowledge_base.to_string(),
        created_at: smk3_common::time::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO clauses (id, criterion_id, clause_number, title, description, knowledge_base, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(clause.id.to_string())
    .bind(clause.criteria_id.to_string())
    .bind(&clause.clause_number)
    .bind(&clause.title)
    .bind(&clause.description)
    .bind(&clause.knowledge_base)
    .bind(format_time(clause.created_at))
    .execute(pool)
    .await?;

    Ok(clause)
}

/// Replace the knowledge base text; `false` when the clause is unknown
pub async fn update_knowledge_base(pool: &SqlitePool, id: Uuid, knowledge_base: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE clauses SET knowledge_base = ? WHERE id = ?")
        .bind(knowledge_base)
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_clause(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM clauses WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::criteria::create_criterion;
    use crate::db::test_support::test_pool;

    #[tokio::test]
    async fn test_clause_crud_and_ordering() {
        let (_dir, pool) = test_pool().await;
        let second = create_criterion(&pool, "B", "", 2).await.unwrap();
        let first = create_criterion(&pool, "A", "", 1).await.unwrap();

        create_clause(&pool, second.id, "2.1.1", "T3", "", "").await.unwrap();
        let c1 = create_clause(&pool, first.id, "1.1.1", "T1", "", "kb").await.unwrap();
        create_clause(&pool, first.id, "1.1.2", "T2", "", "").await.unwrap();

        let all: Vec<String> = list_clauses(&pool, None)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.clause_number)
            .collect();
        assert_eq!(all, vec!["1.1.1", "1.1.2", "2.1.1"]);

        assert_eq!(list_clauses(&pool, Some(second.id)).await.unwrap().len(), 1);
        assert!(clause_number_exists(&pool, first.id, "1.1.1").await.unwrap());
        assert!(!clause_number_exists(&pool, second.id, "1.1.1").await.unwrap());

        assert!(update_knowledge_base(&pool, c1.id, "baru").await.unwrap());
        assert_eq!(get_clause(&pool, c1.id).await.unwrap().unwrap().knowledge_base, "baru");

        assert!(delete_clause(&pool, c1.id).await.unwrap());
        assert!(get_clause(&pool, c1.id).await.unwrap().is_none());
    }
}
