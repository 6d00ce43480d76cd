//! Security oversight types: events, incidents, risk assessments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AssessmentId, EventId, IncidentId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Contribution of one event to a subject's risk score
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 5,
            Severity::Medium => 15,
            Severity::High => 30,
            Severity::Critical => 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_id: EventId,
    pub tenant_id: TenantId,
    pub event_type: String,
    pub severity: Severity,
    pub source: String,
    pub description: String,
    pub subject_user_id: Option<UserId>,
    pub reported_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Investigating,
    Resolved,
    Closed,
}

impl IncidentStatus {
    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Open, Investigating) | (Open, Resolved) | (Investigating, Resolved) | (Resolved, Closed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentNote {
    pub author: UserId,
    pub status: IncidentStatus,
    pub note: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub incident_id: IncidentId,
    pub tenant_id: TenantId,
    pub title: String,
    pub severity: Severity,
    pub status: IncidentStatus,
    pub event_ids: Vec<EventId>,
    pub notes: Vec<IncidentNote>,
    pub opened_by: UserId,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Shared 0..=100 score banding
    pub fn from_score(score: u8) -> Self {
        match score {
            75.. => RiskLevel::Critical,
            50..=74 => RiskLevel::High,
            25..=49 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: AssessmentId,
    pub tenant_id: TenantId,
    pub subject_user_id: UserId,
    pub score: u8,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    pub assessed_by: UserId,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityOverview {
    pub events_total: usize,
    pub events_last_24h: usize,
    pub critical_events_last_24h: usize,
    pub open_incidents: usize,
    pub investigating_incidents: usize,
    pub high_risk_subjects: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incident_transitions() {
        use IncidentStatus::*;
        assert!(Open.can_transition_to(Investigating));
        assert!(Open.can_transition_to(Resolved));
        assert!(Investigating.can_transition_to(Resolved));
        assert!(Resolved.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Open));
        assert!(!Investigating.can_transition_to(Open));
        assert!(!Open.can_transition_to(Closed));
    }

    #[test]
    fn test_risk_banding() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }
}
