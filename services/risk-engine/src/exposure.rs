//! Exposure and equity aggregation over open positions

use rust_decimal::Decimal;
use types::margin::Position;

/// `equity = collateral + unrealized_pnl`
pub fn equity(collateral: Decimal, unrealized_pnl: Decimal) -> Decimal {
    collateral + unrealized_pnl
}

fn open(positions: &[Position]) -> impl Iterator<Item = &Position> {
    positions.iter().filter(|p| p.is_open())
}

/// Σ size × mark over open positions
pub fn total_exposure(positions: &[Position]) -> Decimal {
    open(positions).map(Position::notional).sum()
}

pub fn total_unrealized_pnl(positions: &[Position]) -> Decimal {
    open(positions).map(Position::unrealized_pnl).sum()
}

/// Maintenance requirement at current marks
pub fn total_maintenance_margin(positions: &[Position]) -> Decimal {
    open(positions).map(Position::maintenance_margin).sum()
}

/// Initial margin locked by open positions
pub fn total_margin_used(positions: &[Position]) -> Decimal {
    open(positions).map(|p| p.initial_margin).sum()
}
