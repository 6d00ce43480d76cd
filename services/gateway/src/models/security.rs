use serde::Deserialize;
use types::ids::{EventId, UserId};
use types::security::{IncidentStatus, Severity};

use crate::validation::{Validate, ValidationResult, in_range, non_empty, text};
use platform::security::MAX_EVENT_PAGE;

const MAX_LINKED_EVENTS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: String,
    pub severity: Severity,
    pub source: String,
    pub description: String,
    pub user_id: Option<UserId>,
}

impl Validate for RecordEventRequest {
    fn validate(&self) -> ValidationResult {
        text("event_type", &self.event_type, 2, 64)?;
        non_empty("source", &self.source, 64)?;
        non_empty("description", &self.description, 2000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventQuery {
    pub severity: Option<Severity>,
    pub user_id: Option<UserId>,
    pub limit: Option<usize>,
}

impl Validate for EventQuery {
    fn validate(&self) -> ValidationResult {
        match self.limit {
            Some(limit) => in_range("limit", limit, 1, MAX_EVENT_PAGE),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenIncidentRequest {
    pub title: String,
    pub severity: Severity,
    #[serde(default)]
    pub event_ids: Vec<EventId>,
}

impl Validate for OpenIncidentRequest {
    fn validate(&self) -> ValidationResult {
        text("title", &self.title, 3, 200)?;
        if self.event_ids.len() > MAX_LINKED_EVENTS {
            return Err(format!("event_ids must contain at most {MAX_LINKED_EVENTS} entries"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentQuery {
    pub status: Option<IncidentStatus>,
}

impl Validate for IncidentQuery {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateIncidentRequest {
    pub status: IncidentStatus,
    pub note: Option<String>,
}

impl Validate for UpdateIncidentRequest {
    fn validate(&self) -> ValidationResult {
        match &self.note {
            Some(note) => non_empty("note", note, 2000),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssessmentRequest {
    pub user_id: UserId,
}

impl Validate for AssessmentRequest {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_query_limit() {
        let query: EventQuery = serde_json::from_str(r#"{"severity":"HIGH","limit":50}"#).unwrap();
        assert!(query.validate().is_ok());
        assert_eq!(query.severity, Some(Severity::High));

        let too_many = EventQuery { limit: Some(MAX_EVENT_PAGE + 1), ..Default::default() };
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_incident_payloads() {
        let open: OpenIncidentRequest =
            serde_json::from_str(r#"{"title":"Credential stuffing","severity":"CRITICAL"}"#).unwrap();
        assert!(open.validate().is_ok());
        assert!(open.event_ids.is_empty());

        let update: UpdateIncidentRequest =
            serde_json::from_str(r#"{"status":"INVESTIGATING","note":"  "}"#).unwrap();
        assert_eq!(update.validate().unwrap_err(), "note must not be empty");

        assert!(serde_json::from_str::<UpdateIncidentRequest>(r#"{"status":"REOPENED"}"#).is_err());
    }
}
