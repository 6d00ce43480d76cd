use rust_decimal::Decimal;
use serde::Deserialize;
use types::ids::PoolId;

use crate::validation::{Validate, ValidationResult, evm_address, in_range, non_negative, positive, token_symbol};

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePoolRequest {
    pub token_a: String,
    pub token_b: String,
    pub fee_bps: u32,
    pub initial_a: Decimal,
    pub initial_b: Decimal,
}

impl Validate for CreatePoolRequest {
    fn validate(&self) -> ValidationResult {
        token_symbol("token_a", &self.token_a)?;
        token_symbol("token_b", &self.token_b)?;
        if self.token_a == self.token_b {
            return Err("token_a and token_b must differ".to_string());
        }
        in_range("fee_bps", self.fee_bps, 1, 1000)?;
        positive("initial_a", self.initial_a)?;
        positive("initial_b", self.initial_b)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteQuery {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
}

impl Validate for QuoteQuery {
    fn validate(&self) -> ValidationResult {
        token_symbol("token_in", &self.token_in)?;
        token_symbol("token_out", &self.token_out)?;
        positive("amount_in", self.amount_in)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapRequestBody {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub recipient: String,
}

impl Validate for SwapRequestBody {
    fn validate(&self) -> ValidationResult {
        token_symbol("token_in", &self.token_in)?;
        token_symbol("token_out", &self.token_out)?;
        if self.token_in == self.token_out {
            return Err("token_in and token_out must differ".to_string());
        }
        positive("amount_in", self.amount_in)?;
        non_negative("min_amount_out", self.min_amount_out)?;
        evm_address("recipient", &self.recipient)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddLiquidityRequest {
    pub pool_id: PoolId,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
}

impl Validate for AddLiquidityRequest {
    fn validate(&self) -> ValidationResult {
        positive("amount_a", self.amount_a)?;
        positive("amount_b", self.amount_b)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawLiquidityRequest {
    pub share_bps: u32,
}

impl Validate for WithdrawLiquidityRequest {
    fn validate(&self) -> ValidationResult {
        in_range("share_bps", self.share_bps, 1, 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_swap_body_checks() {
        let mut body = SwapRequestBody {
            token_in: "ETH".into(),
            token_out: "USDT".into(),
            amount_in: dec!(1),
            min_amount_out: dec!(0),
            recipient: format!("0x{}", "ab".repeat(20)),
        };
        assert!(body.validate().is_ok());

        body.recipient = "not-an-address".into();
        assert!(body.validate().unwrap_err().starts_with("recipient"));

        body.recipient = format!("0x{}", "ab".repeat(20));
        body.token_out = "ETH".into();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_pool_fee_bounds() {
        let pool = CreatePoolRequest {
            token_a: "ETH".into(),
            token_b: "USDT".into(),
            fee_bps: 1001,
            initial_a: dec!(10),
            initial_b: dec!(20000),
        };
        assert!(pool.validate().unwrap_err().starts_with("fee_bps"));
    }
}
