//! Domain records stored by smk3-audit
//!
//! Ids are UUIDv4 stored as TEXT; timestamps are UTC RFC 3339 TEXT.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use smk3_common::api::Role;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Registered user (password digest never leaves the db layer)
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A grouping of related clauses
#[derive(Debug, Clone, Serialize)]
pub struct Criterion {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Display order, 1-based in the bundled catalog
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

/// A single auditable requirement
#[derive(Debug, Clone, Serialize)]
pub struct Clause {
    pub id: Uuid,
    pub criteria_id: Uuid,
    /// Human code such as "7.1.1", unique within the criterion
    pub clause_number: String,
    pub title: String,
    pub description: String,
    /// Rubric fed to the model; empty disables analysis
    pub knowledge_base: String,
    pub created_at: DateTime<Utc>,
}

/// Uploaded evidence file metadata
#[derive(Debug, Clone, Serialize)]
pub struct EvidenceDocument {
    pub id: Uuid,
    pub clause_id: Uuid,
    pub filename: String,
    /// Key of the blob in the evidence store
    #[serde(rename = "file_id")]
    pub blob_ref: String,
    pub mime_type: String,
    pub size: i64,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

/// AI-derived compliance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    #[serde(rename = "compliant")]
    Compliant,
    #[serde(rename = "non-compliant")]
    NonCompliant,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::NonCompliant => "non-compliant",
        }
    }

    /// Indonesian label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Sesuai",
            ComplianceStatus::NonCompliant => "Belum Sesuai",
        }
    }
}

impl FromStr for ComplianceStatus {
    type Err = smk3_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compliant" => Ok(ComplianceStatus::Compliant),
            "non-compliant" => Ok(ComplianceStatus::NonCompliant),
            other => Err(smk3_common::Error::Internal(format!(
                "Unknown compliance status '{}'",
                other
            ))),
        }
    }
}

/// Human auditor's final judgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    #[serde(rename = "confirm")]
    Confirm,
    #[serde(rename = "non-confirm-major", alias = "non_confirm_major")]
    NonConfirmMajor,
    #[serde(rename = "non-confirm-minor", alias = "non_confirm_minor")]
    NonConfirmMinor,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Confirm => "confirm",
            Verdict::NonConfirmMajor => "non-confirm-major",
            Verdict::NonConfirmMinor => "non-confirm-minor",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Confirm => "Confirm",
            Verdict::NonConfirmMajor => "Non-Confirm Mayor",
            Verdict::NonConfirmMinor => "Non-Confirm Minor",
        }
    }
}

impl FromStr for Verdict {
    type Err = smk3_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().replace('_', "-").as_str() {
            "confirm" => Ok(Verdict::Confirm),
            "non-confirm-major" => Ok(Verdict::NonConfirmMajor),
            "non-confirm-minor" => Ok(Verdict::NonConfirmMinor),
            other => Err(smk3_common::Error::InvalidInput(format!(
                "Unknown auditor verdict '{}'",
                other
            ))),
        }
    }
}

/// Auditor verdict layered on an AI result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditorOverlay {
    pub auditor_status: Verdict,
    pub auditor_notes: Option<String>,
    pub agreed_date: Option<NaiveDate>,
    pub auditor_assessed_at: DateTime<Utc>,
    pub auditor_assessed_by: Uuid,
}

/// One analysis result per clause
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub id: Uuid,
    pub clause_id: Uuid,
    pub score: f64,
    pub status: ComplianceStatus,
    pub reasoning: String,
    pub feedback: String,
    pub improvement_suggestions: String,
    pub audited_at: DateTime<Utc>,
    pub audited_by: Option<Uuid>,
    /// Absent until an auditor submits a verdict
    #[serde(flatten)]
    pub overlay: Option<AuditorOverlay>,
}

impl AuditResult {
    pub fn verdict(&self) -> Option<Verdict> {
        self.overlay.as_ref().map(|o| o.auditor_status)
    }
}

/// Remediation lifecycle; variants are in transition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    InProgress,
    Completed,
}

impl RecommendationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::InProgress => "in_progress",
            RecommendationStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RecommendationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationStatus {
    type Err = smk3_common::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(RecommendationStatus::Pending),
            "in_progress" | "in-progress" => Ok(RecommendationStatus::InProgress),
            "completed" => Ok(RecommendationStatus::Completed),
            other => Err(smk3_common::Error::InvalidInput(format!(
                "Unknown recommendation status '{}'",
                other
            ))),
        }
    }
}

/// Remediation action with a deadline
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub clause_id: Uuid,
    pub recommendation_text: String,
    pub deadline: DateTime<Utc>,
    pub status: RecommendationStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_accepts_underscore_forms() {
        let v: Verdict = serde_json::from_str("\"non_confirm_major\"").unwrap();
        assert_eq!(v, Verdict::NonConfirmMajor);
        assert_eq!("non_confirm_minor".parse::<Verdict>().unwrap(), Verdict::NonConfirmMinor);
        assert!("approve".parse::<Verdict>().is_err());
    }

    #[test]
    fn test_overlay_absent_from_json_until_set() {
        let result = AuditResult {
            id: Uuid::new_v4(),
            clause_id: Uuid::new_v4(),
            score: 80.0,
            status: ComplianceStatus::Compliant,
            reasoning: String::new(),
            feedback: String::new(),
            improvement_suggestions: String::new(),
            audited_at: Utc::now(),
            audited_by: None,
            overlay: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "compliant");
        assert!(json.get("auditor_status").is_none());
    }

    #[test]
    fn test_recommendation_status_order() {
        assert!(RecommendationStatus::Pending < RecommendationStatus::InProgress);
        assert!(RecommendationStatus::InProgress < RecommendationStatus::Completed);
        assert_eq!(
            serde_json::to_string(&RecommendationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
