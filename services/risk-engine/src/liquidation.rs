//! Liquidation thresholds and prices

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use types::margin::{HealthLevel, PositionSide};
use types::numeric::Price;

pub const LIQUIDATION_THRESHOLD: Decimal = dec!(1.1);
pub const DANGER_THRESHOLD: Decimal = dec!(1.5);
pub const WARNING_THRESHOLD: Decimal = dec!(2.0);

/// Classify health level from margin ratio
pub fn health_status(margin_ratio: Decimal) -> HealthLevel {
    if margin_ratio < LIQUIDATION_THRESHOLD {
        HealthLevel::Liquidation
    } else if margin_ratio < DANGER_THRESHOLD {
        HealthLevel::Danger
    } else if margin_ratio < WARNING_THRESHOLD {
        HealthLevel::Warning
    } else {
        HealthLevel::Healthy
    }
}

pub fn should_liquidate(margin_ratio: Decimal) -> bool {
    margin_ratio < LIQUIDATION_THRESHOLD
}

/// Price at which the position's initial margin is exhausted
///
/// LONG:  `entry - initial_margin / size`
/// SHORT: `entry + initial_margin / size`
pub fn bankruptcy_price(
    side: PositionSide,
    entry_price: Price,
    initial_margin: Decimal,
    size: Decimal,
) -> Option<Price> {
    if size <= Decimal::ZERO {
        return None;
    }
    offset_price(side, entry_price, initial_margin / size)
}

/// Price at which only the maintenance margin would remain
///
/// Triggers before bankruptcy: the offset is `(IM - MM) / size`.
pub fn liquidation_price(
    side: PositionSide,
    entry_price: Price,
    initial_margin: Decimal,
    maintenance_margin: Decimal,
    size: Decimal,
) -> Option<Price> {
    if size <= Decimal::ZERO {
        return None;
    }
    offset_price(side, entry_price, (initial_margin - maintenance_margin) / size)
}

fn offset_price(side: PositionSide, entry_price: Price, offset: Decimal) -> Option<Price> {
    let price = match side {
        PositionSide::LONG => entry_price.as_decimal() - offset,
        PositionSide::SHORT => entry_price.as_decimal() + offset,
    };
    Price::try_new(price.round_dp(8))
}
