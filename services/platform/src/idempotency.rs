//! Idempotency keys for mutating admin requests
//!
//! Records are scoped by `(tenant, key)` and remember the fingerprint of
//! the first request body. A finished record replays its response until
//! the TTL lapses.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use types::ids::TenantId;

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

pub const MAX_KEY_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdempotencyOutcome {
    /// First sighting: run the request, then `complete` or `abandon`
    Proceed,
    Replay(StoredResponse),
}

#[async_trait]
pub trait IdempotencyService: Send + Sync {
    async fn begin(&self, tenant: &TenantId, key: &str, fingerprint: &str) -> PlatformResult<IdempotencyOutcome>;

    async fn complete(&self, tenant: &TenantId, key: &str, response: StoredResponse);

    /// Drops an in-flight record so the key can be retried
    async fn abandon(&self, tenant: &TenantId, key: &str);
}

/// SHA-256 hex of a request body
pub fn request_fingerprint(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[derive(Debug, Clone)]
enum RecordState {
    InFlight,
    Done(StoredResponse),
}

#[derive(Debug, Clone)]
struct Record {
    fingerprint: String,
    state: RecordState,
    created_at: DateTime<Utc>,
}

pub struct InMemoryIdempotency {
    records: DashMap<(TenantId, String), Record>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl InMemoryIdempotency {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            records: DashMap::new(),
            ttl,
            clock,
        }
    }

    fn validate_key(key: &str) -> PlatformResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN || !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(PlatformError::validation(format!(
                "Idempotency-Key: expected 1-{MAX_KEY_LEN} printable ASCII characters"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IdempotencyService for InMemoryIdempotency {
    async fn begin(&self, tenant: &TenantId, key: &str, fingerprint: &str) -> PlatformResult<IdempotencyOutcome> {
        Self::validate_key(key)?;
        let now = self.clock.now();
        let fresh = Record {
            fingerprint: fingerprint.to_string(),
            state: RecordState::InFlight,
            created_at: now,
        };

        let (ttl, before) = (self.ttl, self.records.len());
        self.records.retain(|_, r| now - r.created_at < ttl);
        let purged = before.saturating_sub(self.records.len());
        if purged > 0 {
            debug!(purged, "idempotency records expired");
        }
        match self.records.entry((tenant.clone(), key.to_string())) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                Ok(IdempotencyOutcome::Proceed)
            }
            Entry::Occupied(slot) => {
                let record = slot.get();
                if record.fingerprint != fingerprint {
                    return Err(PlatformError::unprocessable(
                        "IDEMPOTENCY_KEY_REUSED",
                        "Idempotency-Key was already used with a different request body",
                    ));
                }
                match &record.state {
                    RecordState::InFlight => Err(PlatformError::conflict(
                        "IDEMPOTENCY_IN_PROGRESS",
                        "a request with this Idempotency-Key is still in progress",
                    )),
                    RecordState::Done(response) => Ok(IdempotencyOutcome::Replay(response.clone())),
                }
            }
        }
    }

    async fn complete(&self, tenant: &TenantId, key: &str, response: StoredResponse) {
        if let Some(mut record) = self.records.get_mut(&(tenant.clone(), key.to_string())) {
            record.state = RecordState::Done(response);
        }
    }

    async fn abandon(&self, tenant: &TenantId, key: &str) {
        self.records
            .remove_if(&(tenant.clone(), key.to_string()), |_, r| matches!(r.state, RecordState::InFlight));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn setup() -> (Arc<ManualClock>, InMemoryIdempotency, TenantId) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let svc = InMemoryIdempotency::new(Duration::hours(24), clock.clone());
        (clock, svc, TenantId::try_new("acme").unwrap())
    }

    #[tokio::test]
    async fn test_replay_and_reuse() {
        let (_, svc, tenant) = setup();
        let fp = request_fingerprint(br#"{"user_id":"a"}"#);

        assert_eq!(svc.begin(&tenant, "k1", &fp).await.unwrap(), IdempotencyOutcome::Proceed);
        let err = svc.begin(&tenant, "k1", &fp).await.unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_IN_PROGRESS");

        let response = StoredResponse {
            status: 201,
            body: json!({"success": true}),
        };
        svc.complete(&tenant, "k1", response.clone()).await;
        assert_eq!(
            svc.begin(&tenant, "k1", &fp).await.unwrap(),
            IdempotencyOutcome::Replay(response)
        );

        let other = request_fingerprint(br#"{"user_id":"b"}"#);
        let err = svc.begin(&tenant, "k1", &other).await.unwrap_err();
        assert_eq!(err.code(), "IDEMPOTENCY_KEY_REUSED");

        // keys are tenant-scoped
        let globex = TenantId::try_new("globex").unwrap();
        assert_eq!(svc.begin(&globex, "k1", &other).await.unwrap(), IdempotencyOutcome::Proceed);
    }

    #[tokio::test]
    async fn test_expiry_and_abandon() {
        let (clock, svc, tenant) = setup();
        let fp = request_fingerprint(b"{}");
        svc.begin(&tenant, "k2", &fp).await.unwrap();
        svc.abandon(&tenant, "k2").await;
        assert_eq!(svc.begin(&tenant, "k2", &fp).await.unwrap(), IdempotencyOutcome::Proceed);

        svc.complete(&tenant, "k2", StoredResponse { status: 200, body: json!(1) }).await;
        clock.advance(Duration::hours(25));
        let other = request_fingerprint(b"[]");
        assert_eq!(svc.begin(&tenant, "k2", &other).await.unwrap(), IdempotencyOutcome::Proceed);
    }

    #[tokio::test]
    async fn test_expired_records_are_purged() {
        let (clock, svc, tenant) = setup();
        let fp = request_fingerprint(b"{}");
        for key in ["a", "b", "c"] {
            svc.begin(&tenant, key, &fp).await.unwrap();
            svc.complete(&tenant, key, StoredResponse { status: 201, body: json!(key) }).await;
        }
        assert_eq!(svc.records.len(), 3);

        clock.advance(Duration::hours(25));
        svc.begin(&tenant, "d", &fp).await.unwrap();
        assert_eq!(svc.records.len(), 1);
        assert!(svc.records.contains_key(&(tenant.clone(), "d".to_string())));
    }

    #[tokio::test]
    async fn test_key_validation() {
        let (_, svc, tenant) = setup();
        assert!(svc.begin(&tenant, "", "x").await.is_err());
        assert!(svc.begin(&tenant, "has space", "x").await.is_err());
    }
}
