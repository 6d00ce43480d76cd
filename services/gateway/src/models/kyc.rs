use chrono::NaiveDate;
use serde::Deserialize;
use types::auth::KycLevel;
use types::kyc::{DocumentType, KycStatus, ReviewDecision};

use crate::validation::{Validate, ValidationResult, alphanumeric, country_code, non_empty, text};

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitKycRequest {
    pub full_name: String,
    /// ISO date, `YYYY-MM-DD`
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub document_type: DocumentType,
    pub document_number: String,
}

impl Validate for SubmitKycRequest {
    fn validate(&self) -> ValidationResult {
        text("full_name", &self.full_name, 2, 120)?;
        country_code("country", &self.country)?;
        alphanumeric("document_number", &self.document_number, 4, 32)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionQuery {
    pub status: Option<KycStatus>,
}

impl Validate for SubmissionQuery {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewRequest {
    pub decision: ReviewDecision,
    pub level: Option<KycLevel>,
    pub reason: Option<String>,
}

impl Validate for ReviewRequest {
    fn validate(&self) -> ValidationResult {
        match self.decision {
            ReviewDecision::Approve => match self.level {
                Some(level) if level >= KycLevel::BASIC => Ok(()),
                _ => Err("level must be 1 to 3 when approving".to_string()),
            },
            ReviewDecision::Reject => non_empty("reason", self.reason.as_deref().unwrap_or_default(), 500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_rules() {
        let approve: ReviewRequest = serde_json::from_str(r#"{"decision":"APPROVE","level":2}"#).unwrap();
        assert!(approve.validate().is_ok());

        let no_level: ReviewRequest = serde_json::from_str(r#"{"decision":"APPROVE","level":0}"#).unwrap();
        assert!(no_level.validate().is_err());

        let reject: ReviewRequest = serde_json::from_str(r#"{"decision":"REJECT"}"#).unwrap();
        assert_eq!(reject.validate().unwrap_err(), "reason must not be empty");

        assert!(serde_json::from_str::<ReviewRequest>(r#"{"decision":"APPROVE","level":9}"#).is_err());
    }

    #[test]
    fn test_submission_shape() {
        let req: SubmitKycRequest = serde_json::from_str(
            r#"{"full_name":"Ada Lovelace","date_of_birth":"1990-12-10","country":"GB",
                "document_type":"PASSPORT","document_number":"X1234567"}"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert!(serde_json::from_str::<SubmitKycRequest>(
            r#"{"full_name":"Ada","date_of_birth":"10/12/1990","country":"GB",
                "document_type":"PASSPORT","document_number":"X1234567"}"#,
        )
        .is_err());
    }
}
