//! Risk engine orchestrator
//!
//! Ties margin tiers, exposure aggregation and liquidation thresholds
//! together for the margin trading service.

use rust_decimal::Decimal;
use types::margin::{AccountHealth, HealthLevel, Position, PositionSide};
use types::numeric::{Price, Quantity};

use crate::error::RiskError;
use crate::exposure;
use crate::liquidation;
use crate::margin::{self, LeverageTier};

/// Margin terms for a position about to be opened
#[derive(Debug, Clone, PartialEq)]
pub struct PositionTerms {
    pub notional: Decimal,
    pub tier: LeverageTier,
    pub initial_margin: Decimal,
    pub maintenance_margin: Decimal,
    pub liquidation_price: Option<Price>,
}

#[derive(Debug, Clone, Default)]
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// Tier, margins and liquidation price for a prospective position
    pub fn position_terms(
        &self,
        side: PositionSide,
        size: Quantity,
        entry_price: Price,
        leverage: u8,
    ) -> Result<PositionTerms, RiskError> {
        if size.is_zero() {
            return Err(RiskError::InvalidSize);
        }
        if leverage == 0 {
            return Err(RiskError::LeverageTooLow);
        }
        let notional = size.notional(entry_price);
        let tier = margin::leverage_tier(notional);
        if !margin::is_leverage_valid(notional, leverage) {
            return Err(RiskError::LeverageTooHigh {
                requested: leverage,
                max: tier.max_leverage,
            });
        }

        let initial_margin = margin::initial_margin(notional, leverage);
        let maintenance_margin = margin::maintenance_margin(notional, tier.mm_rate);
        let liquidation_price = liquidation::liquidation_price(
            side,
            entry_price,
            initial_margin,
            maintenance_margin,
            size.as_decimal(),
        );

        Ok(PositionTerms {
            notional,
            tier,
            initial_margin,
            maintenance_margin,
            liquidation_price,
        })
    }

    /// Pre-trade check: the account must have `terms.initial_margin` free
    pub fn check_open(
        &self,
        collateral: Decimal,
        positions: &[Position],
        terms: &PositionTerms,
    ) -> Result<(), RiskError> {
        let available = self.account_health(collateral, positions).available_margin;
        if available < terms.initial_margin {
            return Err(RiskError::InsufficientMargin {
                required: terms.initial_margin,
                available,
            });
        }
        Ok(())
    }

    /// Aggregate account risk view at current marks
    pub fn account_health(&self, collateral: Decimal, positions: &[Position]) -> AccountHealth {
        let unrealized_pnl = exposure::total_unrealized_pnl(positions);
        let equity = exposure::equity(collateral, unrealized_pnl);
        let margin_used = exposure::total_margin_used(positions);
        let maintenance_margin = exposure::total_maintenance_margin(positions);
        let margin_ratio = margin::margin_ratio(equity, maintenance_margin);
        let health = margin_ratio.map_or(HealthLevel::Healthy, liquidation::health_status);

        AccountHealth {
            collateral,
            unrealized_pnl,
            equity,
            margin_used,
            maintenance_margin,
            available_margin: margin::available_margin(equity, margin_used),
            margin_ratio,
            health,
        }
    }

    /// Collateral that may leave the account without touching margin in use
    pub fn withdrawable(&self, collateral: Decimal, positions: &[Position]) -> Decimal {
        let available = self.account_health(collateral, positions).available_margin;
        available.min(collateral).max(Decimal::ZERO)
    }
}
