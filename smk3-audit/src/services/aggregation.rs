//! Achievement statistics per criterion and overall
//!
//! Compliance counts only auditor verdicts of `confirm`. The mean AI score is
//! reported alongside as a reference figure and never feeds the percentage.

use crate::models::{AuditResult, Clause, ComplianceStatus, Criterion, Verdict};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

pub const STRONG_THRESHOLD: f64 = 85.0;
pub const MODERATE_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= STRONG_THRESHOLD {
            Strength::Strong
        } else if percentage >= MODERATE_THRESHOLD {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }

    /// Indonesian rating shown to users
    pub fn label(&self) -> &'static str {
        match self {
            Strength::Strong => "Memuaskan",
            Strength::Moderate => "Baik",
            Strength::Weak => "Kurang",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CriterionStats {
    pub id: Uuid,
    pub name: String,
    pub order: i64,
    pub total_clauses: usize,
    pub audited_clauses: usize,
    pub confirmed_clauses: usize,
    pub achievement_percentage: f64,
    pub average_score: f64,
    pub strength: Strength,
    pub strength_label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_clauses: usize,
    pub audited_clauses: usize,
    pub confirmed_clauses: usize,
    pub non_confirm_major_clauses: usize,
    pub non_confirm_minor_clauses: usize,
    /// Analyzed but not yet given a verdict
    pub pending_review_clauses: usize,
    pub compliant_clauses: usize,
    pub non_compliant_clauses: usize,
    pub achievement_percentage: f64,
    pub average_score: f64,
    pub criteria_scores: Vec<CriterionStats>,
}

/// 100 × confirmed / total, defined as 0 for an empty set
pub fn achievement_percentage(confirmed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * confirmed as f64 / total as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean<'a>(scores: impl Iterator<Item = &'a f64>) -> f64 {
    let (sum, count) = scores.fold((0.0, 0usize), |(sum, count), s| (sum + s, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn is_confirmed(result: &AuditResult) -> bool {
    result.verdict() == Some(Verdict::Confirm)
}

/// Compute dashboard statistics from the full catalog and result set
///
/// Results whose clause no longer exists are ignored.
pub fn aggregate(criteria: &[Criterion], clauses: &[Clause], results: &[AuditResult]) -> DashboardStats {
    let clause_ids: HashSet<Uuid> = clauses.iter().map(|c| c.id).collect();
    let by_clause: HashMap<Uuid, &AuditResult> = results
        .iter()
        .filter(|r| clause_ids.contains(&r.clause_id))
        .map(|r| (r.clause_id, r))
        .collect();

    let mut criteria_scores = Vec::with_capacity(criteria.len());
    for criterion in criteria {
        let own_results: Vec<&AuditResult> = clauses
            .iter()
            .filter(|c| c.criteria_id == criterion.id)
            .filter_map(|c| by_clause.get(&c.id).copied())
            .collect();
        let total = clauses.iter().filter(|c| c.criteria_id == criterion.id).count();
        let confirmed = own_results.iter().filter(|r| is_confirmed(r)).count();
        let percentage = achievement_percentage(confirmed, total);
        let strength = Strength::from_percentage(percentage);

        criteria_scores.push(CriterionStats {
            id: criterion.id,
            name: criterion.name.clone(),
            order: criterion.order,
            total_clauses: total,
            audited_clauses: own_results.len(),
            confirmed_clauses: confirmed,
            achievement_percentage: round2(percentage),
            average_score: round2(mean(own_results.iter().map(|r| &r.score))),
            strength,
            strength_label: strength.label(),
        });
    }

    let counted: Vec<&AuditResult> = by_clause.values().copied().collect();
    let count_verdict = |v: Verdict| counted.iter().filter(|r| r.verdict() == Some(v)).count();
    let confirmed = count_verdict(Verdict::Confirm);
    let compliant = counted
        .iter()
        .filter(|r| r.status == ComplianceStatus::Compliant)
        .count();

    DashboardStats {
        total_clauses: clauses.len(),
        audited_clauses: counted.len(),
        confirmed_clauses: confirmed,
        non_confirm_major_clauses: count_verdict(Verdict::NonConfirmMajor),
        non_confirm_minor_clauses: count_verdict(Verdict::NonConfirmMinor),
        pending_review_clauses: counted.iter().filter(|r| r.overlay.is_none()).count(),
        compliant_clauses: compliant,
        non_compliant_clauses: counted.len() - compliant,
        achievement_percentage: round2(achievement_percentage(confirmed, clauses.len())),
        average_score: round2(mean(counted.iter().map(|r| &r.score))),
        criteria_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AuditorOverlay;
    use chrono::Utc;

    fn criterion(order: i64) -> Criterion {
        Criterion {
            id: Uuid::new_v4(),
            name: format!("Kriteria {}", order),
            description: String::new(),
            order,
            created_at: Utc::now(),
        }
    }

    fn clause(criterion: &Criterion, number: &str) -> Clause {
        Clause {
            id: Uuid::new_v4(),
            criteria_id: criterion.id,
            clause_number: number.to_string(),
            title: String::new(),
            description: String::new(),
            knowledge_base: String::new(),
            created_at: Utc::now(),
        }
    }

    fn result(clause: &Clause, score: f64, verdict: Option<Verdict>) -> AuditResult {
        AuditResult {
            id: Uuid::new_v4(),
            clause_id: clause.id,
            score,
            status: if score >= 70.0 {
                ComplianceStatus::Compliant
            } else {
                ComplianceStatus::NonCompliant
            },
            reasoning: String::new(),
            feedback: String::new(),
            improvement_suggestions: String::new(),
            audited_at: Utc::now(),
            audited_by: None,
            overlay: verdict.map(|v| AuditorOverlay {
                auditor_status: v,
                auditor_notes: None,
                agreed_date: None,
                auditor_assessed_at: Utc::now(),
                auditor_assessed_by: Uuid::new_v4(),
            }),
        }
    }

    #[test]
    fn test_two_confirmed_of_five_is_weak() {
        let k = criterion(1);
        let clauses: Vec<Clause> = (1..=5).map(|i| clause(&k, &format!("1.{}", i))).collect();
        let results = vec![
            result(&clauses[0], 80.0, Some(Verdict::Confirm)),
            result(&clauses[1], 60.0, Some(Verdict::Confirm)),
            result(&clauses[2], 90.0, None),
        ];

        let stats = aggregate(&[k], &clauses, &results);
        let row = &stats.criteria_scores[0];
        assert_eq!(row.total_clauses, 5);
        assert_eq!(row.audited_clauses, 3);
        assert_eq!(row.confirmed_clauses, 2);
        assert_eq!(row.achievement_percentage, 40.0);
        assert_eq!(row.strength, Strength::Weak);
        assert_eq!(row.strength_label, "Kurang");
        assert_eq!(row.average_score, 76.67);
    }

    #[test]
    fn test_unreviewed_high_score_never_counts() {
        let k = criterion(1);
        let c = clause(&k, "1.1");
        let stats = aggregate(&[k], &[c.clone()], &[result(&c, 95.0, None)]);

        assert_eq!(stats.confirmed_clauses, 0);
        assert_eq!(stats.achievement_percentage, 0.0);
        assert_eq!(stats.compliant_clauses, 1);
        assert_eq!(stats.pending_review_clauses, 1);
        assert_eq!(stats.average_score, 95.0);
    }

    #[test]
    fn test_empty_catalog_has_zero_achievement() {
        let stats = aggregate(&[], &[], &[]);
        assert_eq!(stats.total_clauses, 0);
        assert_eq!(stats.achievement_percentage, 0.0);
        assert_eq!(stats.average_score, 0.0);
        assert!(stats.criteria_scores.is_empty());
    }

    #[test]
    fn test_criterion_without_clauses() {
        let k = criterion(3);
        let stats = aggregate(&[k], &[], &[]);
        assert_eq!(stats.criteria_scores[0].achievement_percentage, 0.0);
        assert_eq!(stats.criteria_scores[0].strength, Strength::Weak);
    }

    #[test]
    fn test_strength_boundaries() {
        assert_eq!(Strength::from_percentage(85.0), Strength::Strong);
        assert_eq!(Strength::from_percentage(84.99), Strength::Moderate);
        assert_eq!(Strength::from_percentage(60.0), Strength::Moderate);
        assert_eq!(Strength::from_percentage(59.99), Strength::Weak);
    }

    #[test]
    fn test_global_counts_across_criteria() {
        let a = criterion(1);
        let b = criterion(2);
        let a1 = clause(&a, "1.1");
        let a2 = clause(&a, "1.2");
        let b1 = clause(&b, "2.1");
        let results = vec![
            result(&a1, 80.0, Some(Verdict::Confirm)),
            result(&a2, 30.0, Some(Verdict::NonConfirmMajor)),
            result(&b1, 50.0, Some(Verdict::NonConfirmMinor)),
        ];

        let stats = aggregate(&[a, b], &[a1, a2, b1], &results);
        assert_eq!(stats.total_clauses, 3);
        assert_eq!(stats.confirmed_clauses, 1);
        assert_eq!(stats.non_confirm_major_clauses, 1);
        assert_eq!(stats.non_confirm_minor_clauses, 1);
        assert_eq!(stats.pending_review_clauses, 0);
        assert_eq!(stats.achievement_percentage, 33.33);
        assert_eq!(stats.criteria_scores[0].achievement_percentage, 50.0);
        assert_eq!(stats.criteria_scores[1].achievement_percentage, 0.0);
    }

    #[test]
    fn test_orphan_results_ignored() {
        let k = criterion(1);
        let c = clause(&k, "1.1");
        let gone = clause(&k, "1.2");
        let stats = aggregate(&[k], &[c], &[result(&gone, 100.0, Some(Verdict::Confirm))]);
        assert_eq!(stats.audited_clauses, 0);
        assert_eq!(stats.confirmed_clauses, 0);
    }
}
