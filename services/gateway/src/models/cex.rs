use rust_decimal::Decimal;
use serde::Deserialize;
use types::ids::UserId;

use crate::validation::{Validate, ValidationResult, positive};

#[derive(Debug, Clone, Deserialize)]
pub struct CreditThalRequest {
    pub user_id: UserId,
    pub amount: Decimal,
}

impl Validate for CreditThalRequest {
    fn validate(&self) -> ValidationResult {
        positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StakeRequest {
    pub amount: Decimal,
}

impl Validate for StakeRequest {
    fn validate(&self) -> ValidationResult {
        positive("amount", self.amount)
    }
}
