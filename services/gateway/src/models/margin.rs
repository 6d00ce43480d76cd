use rust_decimal::Decimal;
use serde::Deserialize;
use types::ids::{MarketId, UserId};
use types::margin::PositionSide;
use types::numeric::{Price, Quantity};

use crate::validation::{Validate, ValidationResult, in_range, positive};

/// Highest leverage offered by any tier
pub const MAX_LEVERAGE: u8 = 125;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountQuery {
    pub user_id: Option<UserId>,
}

impl Validate for AccountQuery {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AmountRequest {
    pub amount: Decimal,
}

impl Validate for AmountRequest {
    fn validate(&self) -> ValidationResult {
        positive("amount", self.amount)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenPositionRequest {
    pub symbol: MarketId,
    pub side: PositionSide,
    pub size: Quantity,
    pub leverage: u8,
    pub entry_price: Price,
}

impl Validate for OpenPositionRequest {
    fn validate(&self) -> ValidationResult {
        if self.size.is_zero() {
            return Err("size must be positive".to_string());
        }
        in_range("leverage", self.leverage, 1, MAX_LEVERAGE)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PositionQuery {
    #[serde(default)]
    pub include_closed: bool,
}

impl Validate for PositionQuery {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClosePositionRequest {
    pub exit_price: Price,
}

impl Validate for ClosePositionRequest {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPriceRequest {
    pub symbol: MarketId,
    pub price: Price,
}

impl Validate for MarkPriceRequest {
    fn validate(&self) -> ValidationResult {
        Ok(())
    }
}
