//! Margin account and leveraged position types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{MarketId, PositionId, TenantId, UserId};
use crate::numeric::{Price, Quantity};

/// Position side enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionSide {
    /// Profits when price increases
    LONG,
    /// Profits when price decreases
    SHORT,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
    Liquidated,
}

/// Cross-margin collateral account (quote currency)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginAccount {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    /// Deposited collateral plus realized PnL
    pub collateral: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub position_id: PositionId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub symbol: MarketId,
    pub side: PositionSide,
    pub size: Quantity,
    pub entry_price: Price,
    pub mark_price: Price,
    pub leverage: u8,
    pub initial_margin: Decimal,
    pub mm_rate: Decimal,
    pub liquidation_price: Option<Price>,
    pub status: PositionStatus,
    pub realized_pnl: Decimal,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Unrealized PnL at `mark`
    pub fn pnl_at(&self, mark: Price) -> Decimal {
        let diff = mark.as_decimal() - self.entry_price.as_decimal();
        let size = self.size.as_decimal();
        match self.side {
            PositionSide::LONG => diff * size,
            PositionSide::SHORT => -diff * size,
        }
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        self.pnl_at(self.mark_price)
    }

    pub fn notional(&self) -> Decimal {
        self.size.notional(self.mark_price)
    }

    pub fn maintenance_margin(&self) -> Decimal {
        self.notional() * self.mm_rate
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

/// Account health classification by margin ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthLevel {
    /// margin_ratio >= 2.0
    Healthy,
    /// 1.5 <= margin_ratio < 2.0
    Warning,
    /// 1.1 <= margin_ratio < 1.5
    Danger,
    /// margin_ratio < 1.1
    Liquidation,
}

/// Aggregate account risk view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountHealth {
    pub collateral: Decimal,
    pub unrealized_pnl: Decimal,
    pub equity: Decimal,
    pub margin_used: Decimal,
    pub maintenance_margin: Decimal,
    pub available_margin: Decimal,
    /// None when no position is open
    pub margin_ratio: Option<Decimal>,
    pub health: HealthLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn position(side: PositionSide) -> Position {
        Position {
            position_id: PositionId::new(),
            user_id: UserId::new(),
            tenant_id: TenantId::try_new("acme").unwrap(),
            symbol: MarketId::try_new("BTC/USDT").unwrap(),
            side,
            size: Quantity::from_str("2").unwrap(),
            entry_price: Price::from_u64(100),
            mark_price: Price::from_u64(110),
            leverage: 10,
            initial_margin: dec!(20),
            mm_rate: dec!(0.004),
            liquidation_price: None,
            status: PositionStatus::Open,
            realized_pnl: Decimal::ZERO,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn test_pnl_by_side() {
        assert_eq!(position(PositionSide::LONG).unrealized_pnl(), dec!(20));
        assert_eq!(position(PositionSide::SHORT).unrealized_pnl(), dec!(-20));
    }

    #[test]
    fn test_maintenance_margin_uses_mark() {
        let p = position(PositionSide::LONG);
        assert_eq!(p.notional(), dec!(220));
        assert_eq!(p.maintenance_margin(), dec!(0.880));
    }
}
