//! Admin migrations: audited tenant transfers

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};
use types::ids::{MigrationId, TenantId, UserId};
use types::migration::{MigrationKind, MigrationRun, MigrationStatus};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};
use crate::tenancy::TenantDirectory;

#[derive(Debug, Clone, PartialEq)]
pub struct TenantTransfer {
    pub user_id: UserId,
    pub from_tenant: TenantId,
    pub to_tenant: TenantId,
    pub reason: String,
    pub requested_by: UserId,
}

#[async_trait]
pub trait MigrationService: Send + Sync {
    /// Failed attempts are recorded too
    async fn tenant_transfer(&self, request: TenantTransfer) -> PlatformResult<MigrationRun>;

    /// Newest first
    async fn runs(&self) -> Vec<MigrationRun>;

    async fn run(&self, migration_id: &MigrationId) -> PlatformResult<MigrationRun>;
}

pub struct InMemoryMigrations {
    tenants: Arc<TenantDirectory>,
    runs: Mutex<BTreeMap<MigrationId, MigrationRun>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryMigrations {
    pub fn new(tenants: Arc<TenantDirectory>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tenants,
            runs: Mutex::new(BTreeMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl MigrationService for InMemoryMigrations {
    async fn tenant_transfer(&self, request: TenantTransfer) -> PlatformResult<MigrationRun> {
        if request.reason.trim().is_empty() {
            return Err(PlatformError::validation("reason must not be empty"));
        }
        let outcome = self
            .tenants
            .transfer(&request.user_id, &request.from_tenant, &request.to_tenant);
        let run = MigrationRun {
            migration_id: MigrationId::new(),
            kind: MigrationKind::TenantTransfer,
            user_id: request.user_id,
            from_tenant: request.from_tenant,
            to_tenant: request.to_tenant,
            reason: request.reason,
            requested_by: request.requested_by,
            status: if outcome.is_ok() {
                MigrationStatus::Completed
            } else {
                MigrationStatus::Failed
            },
            executed_at: self.clock.now(),
        };
        self.runs.lock().insert(run.migration_id, run.clone());

        match outcome {
            Ok(()) => {
                info!(
                    migration_id = %run.migration_id,
                    user_id = %run.user_id,
                    from = %run.from_tenant,
                    to = %run.to_tenant,
                    "tenant transfer completed"
                );
                Ok(run)
            }
            Err(err) => {
                warn!(migration_id = %run.migration_id, error = %err, "tenant transfer failed");
                Err(err)
            }
        }
    }

    async fn runs(&self) -> Vec<MigrationRun> {
        self.runs.lock().values().rev().cloned().collect()
    }

    async fn run(&self, migration_id: &MigrationId) -> PlatformResult<MigrationRun> {
        self.runs
            .lock()
            .get(migration_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("migration {migration_id}")))
    }
}
