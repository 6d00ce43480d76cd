//! KYC submission types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::KycLevel;
use crate::ids::{KycSubmissionId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Passport,
    NationalId,
    DriversLicense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycSubmission {
    pub submission_id: KycSubmissionId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    /// ISO-3166 alpha-2
    pub country: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub status: KycStatus,
    /// Rule-based score, 0..=100
    pub risk_score: u8,
    pub granted_level: Option<KycLevel>,
    pub reviewer: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// What a user sees about their own verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycOverview {
    pub user_id: UserId,
    pub level: KycLevel,
    pub latest: Option<KycSubmission>,
}
