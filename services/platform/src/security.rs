//! Security oversight: event log, incidents and per-user risk scoring
//!
//! Everything is tenant-scoped. Read methods take `scope: Option<&TenantId>`
//! where `None` means a cross-tenant (platform admin) view.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};
use types::ids::{AssessmentId, EventId, IncidentId, TenantId, UserId};
use types::security::{
    Incident, IncidentNote, IncidentStatus, RiskAssessment, RiskFactor, RiskLevel, SecurityEvent,
    SecurityOverview, Severity,
};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

pub const ASSESSMENT_WINDOW_DAYS: i64 = 30;
pub const OPEN_INCIDENT_POINTS: u32 = 10;
pub const MAX_EVENT_PAGE: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub tenant_id: TenantId,
    pub event_type: String,
    pub severity: Severity,
    pub source: String,
    pub description: String,
    pub subject_user_id: Option<UserId>,
    pub reported_by: UserId,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub severity: Option<Severity>,
    pub subject_user_id: Option<UserId>,
    pub limit: Option<usize>,
}

/// A recorded event plus the incident it opened, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventReceipt {
    pub event: SecurityEvent,
    pub incident: Option<Incident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub tenant_id: TenantId,
    pub title: String,
    pub severity: Severity,
    pub event_ids: Vec<EventId>,
    pub opened_by: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncidentUpdate {
    pub status: IncidentStatus,
    pub note: Option<String>,
    pub author: UserId,
}

#[async_trait]
pub trait SecurityOversightService: Send + Sync {
    /// CRITICAL events auto-open a linked incident
    async fn record_event(&self, event: NewEvent) -> PlatformResult<EventReceipt>;

    /// Newest first
    async fn events(&self, scope: Option<&TenantId>, filter: EventFilter) -> Vec<SecurityEvent>;

    async fn open_incident(&self, incident: NewIncident) -> PlatformResult<Incident>;

    async fn incidents(&self, scope: Option<&TenantId>, status: Option<IncidentStatus>) -> Vec<Incident>;

    async fn get_incident(&self, incident_id: &IncidentId) -> PlatformResult<Incident>;

    async fn update_incident(&self, incident_id: &IncidentId, update: IncidentUpdate) -> PlatformResult<Incident>;

    async fn assess(&self, tenant: &TenantId, subject: &UserId, assessed_by: &UserId) -> PlatformResult<RiskAssessment>;

    /// Newest first
    async fn assessments(&self, scope: Option<&TenantId>, subject: &UserId) -> Vec<RiskAssessment>;

    async fn overview(&self, scope: Option<&TenantId>) -> SecurityOverview;
}

fn in_scope(scope: Option<&TenantId>, tenant: &TenantId) -> bool {
    scope.is_none_or(|s| s == tenant)
}

#[derive(Default)]
struct OversightState {
    events: BTreeMap<EventId, SecurityEvent>,
    incidents: BTreeMap<IncidentId, Incident>,
    assessments: BTreeMap<AssessmentId, RiskAssessment>,
}

impl OversightState {
    fn insert_incident(&mut self, incident: NewIncident, now: chrono::DateTime<chrono::Utc>) -> Incident {
        let record = Incident {
            incident_id: IncidentId::new(),
            tenant_id: incident.tenant_id,
            title: incident.title,
            severity: incident.severity,
            status: IncidentStatus::Open,
            event_ids: incident.event_ids,
            notes: Vec::new(),
            opened_by: incident.opened_by,
            opened_at: now,
            updated_at: now,
        };
        info!(
            incident_id = %record.incident_id,
            tenant_id = %record.tenant_id,
            severity = ?record.severity,
            "incident opened"
        );
        self.incidents.insert(record.incident_id, record.clone());
        record
    }
}

pub struct InMemorySecurityOversight {
    state: Mutex<OversightState>,
    clock: Arc<dyn Clock>,
}

impl InMemorySecurityOversight {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(OversightState::default()),
            clock,
        }
    }
}

#[async_trait]
impl SecurityOversightService for InMemorySecurityOversight {
    async fn record_event(&self, event: NewEvent) -> PlatformResult<EventReceipt> {
        if event.event_type.trim().is_empty() {
            return Err(PlatformError::validation("event_type must not be empty"));
        }
        let now = self.clock.now();
        let record = SecurityEvent {
            event_id: EventId::new(),
            tenant_id: event.tenant_id,
            event_type: event.event_type,
            severity: event.severity,
            source: event.source,
            description: event.description,
            subject_user_id: event.subject_user_id,
            reported_by: event.reported_by,
            occurred_at: now,
        };
        if record.severity == Severity::Critical {
            warn!(event_id = %record.event_id, event_type = %record.event_type, "critical security event");
        } else {
            info!(event_id = %record.event_id, severity = ?record.severity, "security event recorded");
        }

        let mut state = self.state.lock();
        state.events.insert(record.event_id, record.clone());
        let incident = (record.severity == Severity::Critical).then(|| {
            state.insert_incident(
                NewIncident {
                    tenant_id: record.tenant_id.clone(),
                    title: format!("Critical event: {}", record.event_type),
                    severity: Severity::Critical,
                    event_ids: vec![record.event_id],
                    opened_by: record.reported_by,
                },
                now,
            )
        });
        Ok(EventReceipt { event: record, incident })
    }

    async fn events(&self, scope: Option<&TenantId>, filter: EventFilter) -> Vec<SecurityEvent> {
        let limit = filter.limit.unwrap_or(100).clamp(1, MAX_EVENT_PAGE);
        self.state
            .lock()
            .events
            .values()
            .rev()
            .filter(|e| in_scope(scope, &e.tenant_id))
            .filter(|e| filter.severity.is_none_or(|s| e.severity == s))
            .filter(|e| filter.subject_user_id.is_none_or(|u| e.subject_user_id == Some(u)))
            .take(limit)
            .cloned()
            .collect()
    }

    async fn open_incident(&self, incident: NewIncident) -> PlatformResult<Incident> {
        if incident.title.trim().is_empty() {
            return Err(PlatformError::validation("title must not be empty"));
        }
        let now = self.clock.now();
        let mut state = self.state.lock();
        for id in &incident.event_ids {
            match state.events.get(id) {
                Some(e) if e.tenant_id == incident.tenant_id => {}
                _ => return Err(PlatformError::not_found(format!("event {id}"))),
            }
        }
        Ok(state.insert_incident(incident, now))
    }

    async fn incidents(&self, scope: Option<&TenantId>, status: Option<IncidentStatus>) -> Vec<Incident> {
        self.state
            .lock()
            .incidents
            .values()
            .filter(|i| in_scope(scope, &i.tenant_id))
            .filter(|i| status.is_none_or(|s| i.status == s))
            .cloned()
            .collect()
    }

    async fn get_incident(&self, incident_id: &IncidentId) -> PlatformResult<Incident> {
        self.state
            .lock()
            .incidents
            .get(incident_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("incident {incident_id}")))
    }

    async fn update_incident(&self, incident_id: &IncidentId, update: IncidentUpdate) -> PlatformResult<Incident> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let incident = state
            .incidents
            .get_mut(incident_id)
            .ok_or_else(|| PlatformError::not_found(format!("incident {incident_id}")))?;
        if !incident.status.can_transition_to(update.status) {
            return Err(PlatformError::conflict(
                "INVALID_TRANSITION",
                format!("cannot move incident from {:?} to {:?}", incident.status, update.status),
            ));
        }
        incident.status = update.status;
        incident.updated_at = now;
        incident.notes.push(IncidentNote {
            author: update.author,
            status: update.status,
            note: update.note.unwrap_or_default(),
            at: now,
        });
        info!(incident_id = %incident_id, status = ?update.status, "incident updated");
        Ok(incident.clone())
    }

    async fn assess(&self, tenant: &TenantId, subject: &UserId, assessed_by: &UserId) -> PlatformResult<RiskAssessment> {
        let now = self.clock.now();
        let since = now - Duration::days(ASSESSMENT_WINDOW_DAYS);
        let mut state = self.state.lock();

        let recent: Vec<&SecurityEvent> = state
            .events
            .values()
            .filter(|e| &e.tenant_id == tenant && e.subject_user_id.as_ref() == Some(subject))
            .filter(|e| e.occurred_at >= since)
            .collect();

        let mut factors = Vec::new();
        for severity in [Severity::Critical, Severity::High, Severity::Medium, Severity::Low] {
            let count = recent.iter().filter(|e| e.severity == severity).count() as u32;
            if count > 0 {
                factors.push(RiskFactor {
                    factor: format!("{count} {severity:?} event(s) in the last {ASSESSMENT_WINDOW_DAYS} days")
                        .to_lowercase(),
                    points: count * severity.weight(),
                });
            }
        }

        // every event of the subject counts here, not only the recent ones
        let subject_events: Vec<EventId> = state
            .events
            .values()
            .filter(|e| &e.tenant_id == tenant && e.subject_user_id.as_ref() == Some(subject))
            .map(|e| e.event_id)
            .collect();
        // only OPEN incidents score; INVESTIGATING ones do not
        let open = state
            .incidents
            .values()
            .filter(|i| i.status == IncidentStatus::Open)
            .filter(|i| i.event_ids.iter().any(|id| subject_events.contains(id)))
            .count() as u32;
        if open > 0 {
            factors.push(RiskFactor {
                factor: format!("{open} open incident(s)"),
                points: open * OPEN_INCIDENT_POINTS,
            });
        }

        let score = factors.iter().map(|f| f.points).sum::<u32>().min(100) as u8;
        let assessment = RiskAssessment {
            assessment_id: AssessmentId::new(),
            tenant_id: tenant.clone(),
            subject_user_id: *subject,
            score,
            level: RiskLevel::from_score(score),
            factors,
            assessed_by: *assessed_by,
            assessed_at: now,
        };
        info!(
            subject = %subject,
            score,
            level = ?assessment.level,
            "risk assessment computed"
        );
        state.assessments.insert(assessment.assessment_id, assessment.clone());
        Ok(assessment)
    }

    async fn assessments(&self, scope: Option<&TenantId>, subject: &UserId) -> Vec<RiskAssessment> {
        self.state
            .lock()
            .assessments
            .values()
            .rev()
            .filter(|a| in_scope(scope, &a.tenant_id) && &a.subject_user_id == subject)
            .cloned()
            .collect()
    }

    async fn overview(&self, scope: Option<&TenantId>) -> SecurityOverview {
        let now = self.clock.now();
        let day_ago = now - Duration::hours(24);
        let state = self.state.lock();

        let mut overview = SecurityOverview::default();
        for event in state.events.values().filter(|e| in_scope(scope, &e.tenant_id)) {
            overview.events_total += 1;
            if event.occurred_at >= day_ago {
                overview.events_last_24h += 1;
                if event.severity == Severity::Critical {
                    overview.critical_events_last_24h += 1;
                }
            }
        }
        for incident in state.incidents.values().filter(|i| in_scope(scope, &i.tenant_id)) {
            match incident.status {
                IncidentStatus::Open => overview.open_incidents += 1,
                IncidentStatus::Investigating => overview.investigating_incidents += 1,
                _ => {}
            }
        }
        // latest assessment per subject
        let mut latest: HashMap<UserId, RiskLevel> = HashMap::new();
        for assessment in state.assessments.values().filter(|a| in_scope(scope, &a.tenant_id)) {
            latest.insert(assessment.subject_user_id, assessment.level);
        }
        overview.high_risk_subjects = latest.values().filter(|l| **l >= RiskLevel::High).count();
        overview
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn tenant(slug: &str) -> TenantId {
        TenantId::try_new(slug).unwrap()
    }

    fn event(tenant_id: TenantId, severity: Severity, subject: Option<UserId>) -> NewEvent {
        NewEvent {
            tenant_id,
            event_type: "login_anomaly".into(),
            severity,
            source: "auth".into(),
            description: "unusual login location".into(),
            subject_user_id: subject,
            reported_by: UserId::new(),
        }
    }

    fn service() -> (Arc<ManualClock>, InMemorySecurityOversight) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap()));
        (clock.clone(), InMemorySecurityOversight::new(clock))
    }

    #[tokio::test]
    async fn test_critical_event_opens_incident() {
        let (_, svc) = service();
        let low = svc.record_event(event(tenant("acme"), Severity::Low, None)).await.unwrap();
        assert!(low.incident.is_none());

        let critical = svc
            .record_event(event(tenant("acme"), Severity::Critical, None))
            .await
            .unwrap();
        let incident = critical.incident.unwrap();
        assert_eq!(incident.event_ids, vec![critical.event.event_id]);
        assert_eq!(incident.status, IncidentStatus::Open);
    }

    #[tokio::test]
    async fn test_incident_transitions() {
        let (_, svc) = service();
        let receipt = svc
            .record_event(event(tenant("acme"), Severity::Critical, None))
            .await
            .unwrap();
        let id = receipt.incident.unwrap().incident_id;
        let author = UserId::new();
        let update = |status| IncidentUpdate {
            status,
            note: Some("triage".into()),
            author,
        };

        let err = svc.update_incident(&id, update(IncidentStatus::Closed)).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_TRANSITION");

        svc.update_incident(&id, update(IncidentStatus::Investigating)).await.unwrap();
        svc.update_incident(&id, update(IncidentStatus::Resolved)).await.unwrap();
        let closed = svc.update_incident(&id, update(IncidentStatus::Closed)).await.unwrap();
        assert_eq!(closed.notes.len(), 3);
    }

    #[tokio::test]
    async fn test_risk_assessment_scoring() {
        let (clock, svc) = service();
        let subject = UserId::new();
        let acme = tenant("acme");

        // outside the 30 day window once the clock moves
        svc.record_event(event(acme.clone(), Severity::High, Some(subject))).await.unwrap();
        clock.advance(Duration::days(31));

        svc.record_event(event(acme.clone(), Severity::High, Some(subject))).await.unwrap();
        svc.record_event(event(acme.clone(), Severity::Medium, Some(subject))).await.unwrap();
        let critical = svc
            .record_event(event(acme.clone(), Severity::Critical, Some(subject)))
            .await
            .unwrap();

        let assessment = svc.assess(&acme, &subject, &UserId::new()).await.unwrap();
        // 30 + 15 + 50 + 10 (one open incident)
        assert_eq!(assessment.score, 100);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert_eq!(assessment.factors.len(), 4);

        let other = svc.assess(&acme, &UserId::new(), &UserId::new()).await.unwrap();
        assert_eq!(other.score, 0);
        assert_eq!(other.level, RiskLevel::Low);

        let overview = svc.overview(Some(&acme)).await;
        assert_eq!(overview.events_total, 4);
        assert_eq!(overview.events_last_24h, 3);
        assert_eq!(overview.open_incidents, 1);
        assert_eq!(overview.high_risk_subjects, 1);

        let incident_id = critical.incident.unwrap().incident_id;
        svc.update_incident(
            &incident_id,
            IncidentUpdate {
                status: IncidentStatus::Investigating,
                note: None,
                author: UserId::new(),
            },
        )
        .await
        .unwrap();
        let reassessed = svc.assess(&acme, &subject, &UserId::new()).await.unwrap();
        assert_eq!(reassessed.score, 95);
        assert_eq!(reassessed.factors.len(), 3);
    }

    #[tokio::test]
    async fn test_tenant_scoping() {
        let (_, svc) = service();
        svc.record_event(event(tenant("acme"), Severity::Low, None)).await.unwrap();
        svc.record_event(event(tenant("globex"), Severity::Low, None)).await.unwrap();

        assert_eq!(svc.events(Some(&tenant("acme")), EventFilter::default()).await.len(), 1);
        assert_eq!(svc.events(None, EventFilter::default()).await.len(), 2);

        let globex_event = svc.events(Some(&tenant("globex")), EventFilter::default()).await[0].event_id;
        let err = svc
            .open_incident(NewIncident {
                tenant_id: tenant("acme"),
                title: "cross tenant".into(),
                severity: Severity::Low,
                event_ids: vec![globex_event],
                opened_by: UserId::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
