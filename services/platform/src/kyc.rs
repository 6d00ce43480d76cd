//! Identity verification submissions and compliance review

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use parking_lot::Mutex;
use tracing::{info, warn};
use types::auth::KycLevel;
use types::ids::{KycSubmissionId, TenantId, UserId};
use types::kyc::{DocumentType, KycOverview, KycStatus, KycSubmission, ReviewDecision};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

/// FATF call-for-action and sanctioned jurisdictions
pub const HIGH_RISK_COUNTRIES: &[&str] = &["AF", "BY", "CU", "IR", "KP", "MM", "RU", "SY", "YE"];

pub const MIN_AGE: u32 = 18;

/// Approvals at or above this score are capped at [`KycLevel::BASIC`]
pub const HIGH_RISK_SCORE: u8 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub document_type: DocumentType,
    pub document_number: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub reviewer: UserId,
    pub decision: ReviewDecision,
    pub level: Option<KycLevel>,
    pub reason: Option<String>,
}

#[async_trait]
pub trait KycService: Send + Sync {
    async fn submit(&self, submission: NewSubmission) -> PlatformResult<KycSubmission>;

    async fn status(&self, user: &UserId) -> KycOverview;

    /// `tenant = None` lists across every tenant
    async fn list(&self, tenant: Option<&TenantId>, status: Option<KycStatus>) -> Vec<KycSubmission>;

    async fn get(&self, submission_id: &KycSubmissionId) -> PlatformResult<KycSubmission>;

    async fn review(&self, submission_id: &KycSubmissionId, review: Review) -> PlatformResult<KycSubmission>;

    /// Granted level, if the user has ever been approved
    async fn level(&self, user: &UserId) -> Option<KycLevel>;
}

pub(crate) fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    age
}

/// Rule-based onboarding score, 0..=100
pub fn risk_score(submission: &NewSubmission, age: i32, previously_rejected: bool) -> u8 {
    let mut score: u32 = 0;
    if HIGH_RISK_COUNTRIES.contains(&submission.country.as_str()) {
        score += 50;
    }
    if submission.document_type == DocumentType::DriversLicense {
        score += 10;
    }
    if age < 21 {
        score += 10;
    }
    if previously_rejected {
        score += 15;
    }
    score.min(100) as u8
}

#[derive(Default)]
struct KycState {
    submissions: BTreeMap<KycSubmissionId, KycSubmission>,
    levels: HashMap<UserId, KycLevel>,
}

pub struct InMemoryKyc {
    state: Mutex<KycState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryKyc {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(KycState::default()),
            clock,
        }
    }
}

#[async_trait]
impl KycService for InMemoryKyc {
    async fn submit(&self, submission: NewSubmission) -> PlatformResult<KycSubmission> {
        let now = self.clock.now();
        let age = age_on(submission.date_of_birth, now.date_naive());
        if age < MIN_AGE as i32 {
            return Err(PlatformError::validation(format!(
                "date_of_birth: applicant must be at least {MIN_AGE}"
            )));
        }

        let mut state = self.state.lock();
        let (pending, rejected) = state
            .submissions
            .values()
            .filter(|s| s.user_id == submission.user_id)
            .fold((false, false), |(p, r), s| {
                (p || s.status == KycStatus::Pending, r || s.status == KycStatus::Rejected)
            });
        if pending {
            return Err(PlatformError::conflict("KYC_PENDING", "a submission is already pending review"));
        }

        let score = risk_score(&submission, age, rejected);
        let record = KycSubmission {
            submission_id: KycSubmissionId::new(),
            user_id: submission.user_id,
            tenant_id: submission.tenant_id,
            full_name: submission.full_name,
            date_of_birth: submission.date_of_birth,
            country: submission.country,
            document_type: submission.document_type,
            document_number: submission.document_number,
            status: KycStatus::Pending,
            risk_score: score,
            granted_level: None,
            reviewer: None,
            rejection_reason: None,
            submitted_at: now,
            reviewed_at: None,
        };
        info!(
            submission_id = %record.submission_id,
            user_id = %record.user_id,
            risk_score = score,
            "kyc submission received"
        );
        state.submissions.insert(record.submission_id, record.clone());
        Ok(record)
    }

    async fn status(&self, user: &UserId) -> KycOverview {
        let state = self.state.lock();
        KycOverview {
            user_id: *user,
            level: state.levels.get(user).copied().unwrap_or(KycLevel::NONE),
            // ids are time-ordered, so the last match is the newest
            latest: state.submissions.values().rev().find(|s| &s.user_id == user).cloned(),
        }
    }

    async fn list(&self, tenant: Option<&TenantId>, status: Option<KycStatus>) -> Vec<KycSubmission> {
        self.state
            .lock()
            .submissions
            .values()
            .filter(|s| tenant.is_none_or(|t| &s.tenant_id == t))
            .filter(|s| status.is_none_or(|st| s.status == st))
            .cloned()
            .collect()
    }

    async fn get(&self, submission_id: &KycSubmissionId) -> PlatformResult<KycSubmission> {
        self.state
            .lock()
            .submissions
            .get(submission_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("kyc submission {submission_id}")))
    }

    async fn review(&self, submission_id: &KycSubmissionId, review: Review) -> PlatformResult<KycSubmission> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let KycState { submissions, levels } = &mut *guard;
        let submission = submissions
            .get_mut(submission_id)
            .ok_or_else(|| PlatformError::not_found(format!("kyc submission {submission_id}")))?;
        if submission.status != KycStatus::Pending {
            return Err(PlatformError::conflict(
                "KYC_ALREADY_REVIEWED",
                "only pending submissions can be reviewed",
            ));
        }

        match review.decision {
            ReviewDecision::Approve => {
                let requested = review
                    .level
                    .filter(|l| *l >= KycLevel::BASIC)
                    .ok_or_else(|| PlatformError::validation("level: approval requires a level of 1..=3"))?;
                let granted = if submission.risk_score >= HIGH_RISK_SCORE {
                    if requested > KycLevel::BASIC {
                        warn!(
                            submission_id = %submission_id,
                            risk_score = submission.risk_score,
                            "approval capped at level 1"
                        );
                    }
                    requested.min(KycLevel::BASIC)
                } else {
                    requested
                };
                submission.status = KycStatus::Approved;
                submission.granted_level = Some(granted);
                levels.insert(submission.user_id, granted);
            }
            ReviewDecision::Reject => {
                let reason = review
                    .reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| PlatformError::validation("reason: rejection requires a reason"))?;
                submission.status = KycStatus::Rejected;
                submission.rejection_reason = Some(reason);
            }
        }
        submission.reviewer = Some(review.reviewer);
        submission.reviewed_at = Some(now);

        info!(
            submission_id = %submission_id,
            status = ?submission.status,
            reviewer = %review.reviewer,
            "kyc submission reviewed"
        );
        Ok(submission.clone())
    }

    async fn level(&self, user: &UserId) -> Option<KycLevel> {
        self.state.lock().levels.get(user).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};

    fn service() -> InMemoryKyc {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        InMemoryKyc::new(Arc::new(clock))
    }

    fn submission(user: UserId, country: &str, dob: NaiveDate, doc: DocumentType) -> NewSubmission {
        NewSubmission {
            user_id: user,
            tenant_id: TenantId::try_new("acme").unwrap(),
            full_name: "Ada Lovelace".into(),
            date_of_birth: dob,
            country: country.into(),
            document_type: doc,
            document_number: "X1234567".into(),
        }
    }

    fn adult() -> NaiveDate {
        NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()
    }

    fn approve(reviewer: UserId, level: u8) -> Review {
        Review {
            reviewer,
            decision: ReviewDecision::Approve,
            level: KycLevel::new(level),
            reason: None,
        }
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let dob = NaiveDate::from_ymd_opt(2007, 6, 2).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(age_on(dob, today), 17);
        assert_eq!(age_on(dob, today.succ_opt().unwrap()), 18);
    }

    #[tokio::test]
    async fn test_minor_rejected() {
        let kyc = service();
        let dob = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let err = kyc
            .submit(submission(UserId::new(), "DE", dob, DocumentType::Passport))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_single_pending_submission() {
        let kyc = service();
        let user = UserId::new();
        kyc.submit(submission(user, "DE", adult(), DocumentType::Passport)).await.unwrap();
        let err = kyc
            .submit(submission(user, "DE", adult(), DocumentType::Passport))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "KYC_PENDING");
    }

    #[tokio::test]
    async fn test_approval_grants_level() {
        let kyc = service();
        let user = UserId::new();
        let sub = kyc.submit(submission(user, "DE", adult(), DocumentType::Passport)).await.unwrap();
        assert_eq!(sub.risk_score, 0);

        let reviewed = kyc.review(&sub.submission_id, approve(UserId::new(), 2)).await.unwrap();
        assert_eq!(reviewed.status, KycStatus::Approved);
        assert_eq!(kyc.level(&user).await, Some(KycLevel::VERIFIED));
        assert_eq!(kyc.status(&user).await.level, KycLevel::VERIFIED);

        let err = kyc.review(&sub.submission_id, approve(UserId::new(), 2)).await.unwrap_err();
        assert_eq!(err.code(), "KYC_ALREADY_REVIEWED");
    }

    #[tokio::test]
    async fn test_high_risk_approval_capped() {
        let kyc = service();
        let user = UserId::new();
        let sub = kyc
            .submit(submission(user, "IR", adult(), DocumentType::DriversLicense))
            .await
            .unwrap();
        assert_eq!(sub.risk_score, 60);
        let reviewed = kyc.review(&sub.submission_id, approve(UserId::new(), 3)).await.unwrap();
        assert_eq!(reviewed.granted_level, Some(KycLevel::BASIC));
    }

    #[tokio::test]
    async fn test_resubmission_after_rejection_scores_higher() {
        let kyc = service();
        let user = UserId::new();
        let first = kyc.submit(submission(user, "DE", adult(), DocumentType::Passport)).await.unwrap();
        let reject = Review {
            reviewer: UserId::new(),
            decision: ReviewDecision::Reject,
            level: None,
            reason: Some("blurry document".into()),
        };
        kyc.review(&first.submission_id, reject).await.unwrap();

        let second = kyc.submit(submission(user, "DE", adult(), DocumentType::Passport)).await.unwrap();
        assert_eq!(second.risk_score, 15);
        assert_eq!(kyc.status(&user).await.latest.unwrap().submission_id, second.submission_id);
        assert_eq!(kyc.list(None, Some(KycStatus::Pending)).await.len(), 1);
        let other = TenantId::try_new("other").unwrap();
        assert!(kyc.list(Some(&other), None).await.is_empty());
    }
}
