use serde::Deserialize;
use types::ids::{TenantId, UserId};

use crate::validation::{Validate, ValidationResult, text};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";
pub const IDEMPOTENT_REPLAYED_HEADER: &str = "idempotent-replayed";

#[derive(Debug, Clone, Deserialize)]
pub struct TenantTransferRequest {
    pub user_id: UserId,
    pub from_tenant: TenantId,
    pub to_tenant: TenantId,
    pub reason: String,
}

impl Validate for TenantTransferRequest {
    fn validate(&self) -> ValidationResult {
        if self.from_tenant == self.to_tenant {
            return Err("from_tenant and to_tenant must differ".to_string());
        }
        text("reason", &self.reason, 3, 500)
    }
}
