use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use types::ids::PhaseId;
use types::token_sale::{MAX_VESTING_DAYS, VestingTerms};

use crate::validation::{Validate, ValidationResult, evm_address, in_range, positive, text};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePhaseRequest {
    pub name: String,
    pub token_price: Decimal,
    pub token_allocation: Decimal,
    pub min_purchase: Decimal,
    pub max_purchase: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub vesting: VestingTerms,
}

impl Validate for CreatePhaseRequest {
    fn validate(&self) -> ValidationResult {
        text("name", &self.name, 1, 100)?;
        positive("token_price", self.token_price)?;
        positive("token_allocation", self.token_allocation)?;
        positive("min_purchase", self.min_purchase)?;
        if self.max_purchase < self.min_purchase {
            return Err("max_purchase must be at least min_purchase".to_string());
        }
        if self.ends_at <= self.starts_at {
            return Err("ends_at must be after starts_at".to_string());
        }
        in_range("vesting.tge_percent", self.vesting.tge_percent, Decimal::ZERO, Decimal::ONE_HUNDRED)?;
        in_range("vesting.cliff_days", self.vesting.cliff_days, 0, MAX_VESTING_DAYS)?;
        in_range("vesting.duration_days", self.vesting.duration_days, 0, MAX_VESTING_DAYS)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvestRequest {
    pub phase_id: PhaseId,
    pub amount: Decimal,
    pub wallet_address: String,
}

impl Validate for InvestRequest {
    fn validate(&self) -> ValidationResult {
        positive("amount", self.amount)?;
        evm_address("wallet_address", &self.wallet_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase_json(tge: &str, starts: &str, ends: &str) -> serde_json::Value {
        serde_json::json!({
            "name": "Seed",
            "token_price": "0.05",
            "token_allocation": "1000000",
            "min_purchase": "100",
            "max_purchase": "10000",
            "starts_at": starts,
            "ends_at": ends,
            "vesting": { "tge_percent": tge, "cliff_days": 30, "duration_days": 180 }
        })
    }

    #[test]
    fn test_phase_window_and_tge() {
        let ok: CreatePhaseRequest =
            serde_json::from_value(phase_json("10", "2025-01-01T00:00:00Z", "2025-02-01T00:00:00Z")).unwrap();
        assert!(ok.validate().is_ok());

        let inverted: CreatePhaseRequest =
            serde_json::from_value(phase_json("10", "2025-02-01T00:00:00Z", "2025-01-01T00:00:00Z")).unwrap();
        assert_eq!(inverted.validate().unwrap_err(), "ends_at must be after starts_at");

        let tge: CreatePhaseRequest =
            serde_json::from_value(phase_json("120", "2025-01-01T00:00:00Z", "2025-02-01T00:00:00Z")).unwrap();
        assert!(tge.validate().unwrap_err().starts_with("vesting.tge_percent"));

        let mut body = phase_json("10", "2025-01-01T00:00:00Z", "2025-02-01T00:00:00Z");
        body["vesting"]["cliff_days"] = 4_000_000_000u32.into();
        let cliff: CreatePhaseRequest = serde_json::from_value(body).unwrap();
        assert_eq!(cliff.validate().unwrap_err(), "vesting.cliff_days must be between 0 and 3650");
    }
}
