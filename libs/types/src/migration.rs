//! Tenant migration run records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MigrationId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MigrationKind {
    TenantTransfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationRun {
    pub migration_id: MigrationId,
    pub kind: MigrationKind,
    pub user_id: UserId,
    pub from_tenant: TenantId,
    pub to_tenant: TenantId,
    pub reason: String,
    pub requested_by: UserId,
    pub status: MigrationStatus,
    pub executed_at: DateTime<Utc>,
}
