//! Bundled SMK3 clause catalog and seeding
//!
//! The catalog (12 criteria, 166 clauses) is compiled into the binary from
//! `data/smk3_catalog.toml`. Each clause's knowledge base is rendered from
//! its description and required-evidence notes plus the scoring rubric.

use crate::db;
use serde::{Deserialize, Serialize};
use smk3_common::{Error, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::info;

const CATALOG_TOML: &str = include_str!("../../data/smk3_catalog.toml");

const SCORING_RUBRIC: &str = "STANDAR PENILAIAN:
- Skor 100: Semua dokumen/evidence lengkap, terdokumentasi dengan baik, dan sesuai dengan persyaratan peraturan perundangan
- Skor 70-90: Dokumen/evidence ada tetapi tidak lengkap atau tidak seluruhnya sesuai persyaratan
- Skor 40-60: Sebagian dokumen/evidence ada tetapi banyak yang kurang
- Skor 0-30: Dokumen/evidence tidak ada atau sangat tidak memenuhi persyaratan";

const SITE_NOTE: &str = "CATATAN KHUSUS:
Ini adalah persyaratan spesifik untuk PLN Nusantara Power (sebelumnya PJB) PLTU Tenayan. \
Pastikan semua dokumen mengacu pada struktur organisasi dan prosedur PLN Nusantara Power yang terbaru.";

#[derive(Debug, Deserialize)]
pub struct CriterionEntry {
    pub order: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ClauseEntry {
    pub criterion_order: i64,
    pub clause_number: String,
    pub title: String,
    pub description: String,
    pub evidence_notes: String,
}

#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub criteria: Vec<CriterionEntry>,
    pub clauses: Vec<ClauseEntry>,
}

/// Outcome of a seed request
#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub message: String,
    /// False when the catalog was already present
    pub seeded: bool,
    pub criteria: usize,
    pub clauses: usize,
}

pub fn load_catalog() -> Result<Catalog> {
    let catalog: Catalog = toml::from_str(CATALOG_TOML)
        .map_err(|e| Error::Config(format!("Bundled catalog is invalid: {}", e)))?;

    for clause in &catalog.clauses {
        if !catalog.criteria.iter().any(|c| c.order == clause.criterion_order) {
            return Err(Error::Config(format!(
                "Clause {} refers to unknown criterion {}",
                clause.clause_number, clause.criterion_order
            )));
        }
    }

    Ok(catalog)
}

pub fn render_knowledge_base(description: &str, evidence_notes: &str) -> String {
    format!(
        "DESKRIPSI KLAUSUL:\n{}\n\n\
DOKUMEN/EVIDENCE YANG DIPERLUKAN (PLN NUSANTARA POWER PLTU TENAYAN):\n{}\n\n\
{}\n\n{}",
        description.trim(),
        evidence_notes.trim(),
        SCORING_RUBRIC,
        SITE_NOTE
    )
}

/// Insert the bundled catalog unless criteria already exist
pub async fn seed_catalog(pool: &SqlitePool) -> Result<SeedSummary> {
    let existing = db::criteria::count_criteria(pool).await?;
    if existing > 0 {
        let clauses = db::clauses::list_clauses(pool, None).await?.len();
        info!(criteria = existing, clauses, "Catalog already present, skipping seed");
        return Ok(SeedSummary {
            message: "Data already exists".to_string(),
            seeded: false,
            criteria: existing as usize,
            clauses,
        });
    }

    let catalog = load_catalog()?;

    let mut ids = HashMap::new();
    for entry in &catalog.criteria {
        let criterion =
            db::criteria::create_criterion(pool, &entry.name, &entry.description, entry.order).await?;
        ids.insert(entry.order, criterion.id);
    }

    for entry in &catalog.clauses {
        let criteria_id = ids.get(&entry.criterion_order).copied().ok_or_else(|| {
            Error::Config(format!("Unknown criterion order {}", entry.criterion_order))
        })?;
        db::clauses::create_clause(
            pool,
            criteria_id,
            &entry.clause_number,
            &entry.title,
            &entry.description,
            &render_knowledge_base(&entry.description, &entry.evidence_notes),
        )
        .await?;
    }

    info!(
        criteria = catalog.criteria.len(),
        clauses = catalog.clauses.len(),
        "Seeded SMK3 catalog"
    );

    Ok(SeedSummary {
        message: "Data seeded successfully".to_string(),
        seeded: true,
        criteria: catalog.criteria.len(),
        clauses: catalog.clauses.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use std::collections::HashSet;

    #[test]
    fn test_bundled_catalog_shape() {
        let catalog = load_catalog().unwrap();
        assert_eq!(catalog.criteria.len(), 12);
        assert_eq!(catalog.clauses.len(), 166);

        let mut seen = HashSet::new();
        for clause in &catalog.clauses {
            assert!(
                seen.insert((clause.criterion_order, clause.clause_number.clone())),
                "duplicate clause {}",
                clause.clause_number
            );
        }
    }

    #[test]
    fn test_knowledge_base_template() {
        let kb = render_knowledge_base("Kebijakan tertulis", "1) Dokumen kebijakan");
        assert!(kb.starts_with("DESKRIPSI KLAUSUL:\nKebijakan tertulis\n\n"));
        assert!(kb.contains("(PLN NUSANTARA POWER PLTU TENAYAN):\n1) Dokumen kebijakan"));
        assert!(kb.contains("- Skor 40-60:"));
        assert!(kb.ends_with("yang terbaru."));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (_dir, pool) = test_pool().await;

        let first = seed_catalog(&pool).await.unwrap();
        assert!(first.seeded);
        assert_eq!((first.criteria, first.clauses), (12, 166));

        let second = seed_catalog(&pool).await.unwrap();
        assert!(!second.seeded);
        assert_eq!((second.criteria, second.clauses), (12, 166));

        let criteria = db::criteria::list_criteria(&pool).await.unwrap();
        assert_eq!(criteria[0].order, 1);
        let clauses = db::clauses::list_clauses(&pool, Some(criteria[0].id)).await.unwrap();
        assert_eq!(clauses[0].clause_number, "1.1.1");
        assert!(clauses[0].knowledge_base.contains("STANDAR PENILAIAN"));
    }
}
