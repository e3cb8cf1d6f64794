//! Recommendation lifecycle rules and deadline notifications

use crate::models::{Clause, Recommendation, RecommendationStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use smk3_common::time::days_until;
use std::collections::HashMap;
use uuid::Uuid;

/// Deadlines this many days out (or fewer) raise a notification
pub const NOTIFICATION_WINDOW_DAYS: i64 = 7;

/// At or below this many days the notification is critical
pub const CRITICAL_DAYS: i64 = 3;

const UNKNOWN_CLAUSE: &str = "Unknown";

/// Status may only move forward: pending, in_progress, completed
pub fn transition_allowed(current: RecommendationStatus, next: RecommendationStatus) -> bool {
    next >= current
}

/// Completion time to store after moving to `next`
///
/// Entering `completed` stamps the given time or now; a completed item keeps
/// its original stamp.
pub fn completion_time(
    current: &Recommendation,
    next: RecommendationStatus,
    requested: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        RecommendationStatus::Completed => current.completed_at.or(requested).or(Some(now)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub clause_number: String,
    pub clause_title: String,
    pub recommendation: String,
    pub deadline: DateTime<Utc>,
    /// Whole days left, negative when overdue
    pub days_left: i64,
    pub urgency: Urgency,
}

/// Open recommendations due within the window, soonest first
pub fn build_notifications(
    recommendations: &[Recommendation],
    clauses: &[Clause],
    now: DateTime<Utc>,
) -> Vec<Notification> {
    let clauses: HashMap<Uuid, &Clause> = clauses.iter().map(|c| (c.id, c)).collect();

    let mut notifications: Vec<Notification> = recommendations
        .iter()
        .filter(|r| r.status != RecommendationStatus::Completed)
        .filter_map(|r| {
            let days_left = days_until(r.deadline, now);
            if days_left > NOTIFICATION_WINDOW_DAYS {
                return None;
            }
            let clause = clauses.get(&r.clause_id);
            Some(Notification {
                id: r.id,
                clause_number: clause
                    .map(|c| c.clause_number.clone())
                    .unwrap_or_else(|| UNKNOWN_CLAUSE.to_string()),
                clause_title: clause
                    .map(|c| c.title.clone())
                    .unwrap_or_else(|| UNKNOWN_CLAUSE.to_string()),
                recommendation: r.recommendation_text.clone(),
                deadline: r.deadline,
                days_left,
                urgency: if days_left <= CRITICAL_DAYS {
                    Urgency::Critical
                } else {
                    Urgency::Warning
                },
            })
        })
        .collect();

    notifications.sort_by(|a, b| a.days_left.cmp(&b.days_left).then(a.deadline.cmp(&b.deadline)));
    notifications
}
