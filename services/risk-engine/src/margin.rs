//! Margin calculation functions
//!
//! Deterministic margin computations on fixed-point Decimal arithmetic.
//! Requirements round up, availability rounds down.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

/// Leverage tier keyed by position notional (quote currency)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeverageTier {
    /// Inclusive upper bound on notional; None for the last tier
    pub max_position_value: Option<Decimal>,
    pub max_leverage: u8,
    pub im_rate: Decimal,
    pub mm_rate: Decimal,
}

/// | Position Value (USDT)  | Max Leverage | IM Rate | MM Rate |
/// |------------------------|--------------|---------|---------|
/// | 0 – 50,000             | 125x         | 0.80%   | 0.40%   |
/// | 50,001 – 250,000       | 100x         | 1.00%   | 0.50%   |
/// | 250,001 – 1,000,000    | 50x          | 2.00%   | 1.00%   |
/// | 1,000,001 – 5,000,000  | 20x          | 5.00%   | 2.50%   |
/// | 5,000,001 – 20,000,000 | 10x          | 10.00%  | 5.00%   |
/// | 20,000,001+            | 5x           | 20.00%  | 10.00%  |
pub const LEVERAGE_TIERS: [LeverageTier; 6] = [
    LeverageTier {
        max_position_value: Some(dec!(50_000)),
        max_leverage: 125,
        im_rate: dec!(0.008),
        mm_rate: dec!(0.004),
    },
    LeverageTier {
        max_position_value: Some(dec!(250_000)),
        max_leverage: 100,
        im_rate: dec!(0.01),
        mm_rate: dec!(0.005),
    },
    LeverageTier {
        max_position_value: Some(dec!(1_000_000)),
        max_leverage: 50,
        im_rate: dec!(0.02),
        mm_rate: dec!(0.01),
    },
    LeverageTier {
        max_position_value: Some(dec!(5_000_000)),
        max_leverage: 20,
        im_rate: dec!(0.05),
        mm_rate: dec!(0.025),
    },
    LeverageTier {
        max_position_value: Some(dec!(20_000_000)),
        max_leverage: 10,
        im_rate: dec!(0.1),
        mm_rate: dec!(0.05),
    },
    LeverageTier {
        max_position_value: None,
        max_leverage: 5,
        im_rate: dec!(0.2),
        mm_rate: dec!(0.1),
    },
];

/// Tier for a given position notional
pub fn leverage_tier(position_value: Decimal) -> LeverageTier {
    LEVERAGE_TIERS
        .iter()
        .find(|tier| tier.max_position_value.map_or(true, |max| position_value <= max))
        .copied()
        .unwrap_or(LEVERAGE_TIERS[LEVERAGE_TIERS.len() - 1])
}

/// `initial_margin = position_value / leverage`, rounded up to 8 dp
///
/// Leverage of zero is treated as 1x.
pub fn initial_margin(position_value: Decimal, leverage: u8) -> Decimal {
    let leverage = Decimal::from(leverage.max(1));
    round_up(position_value / leverage)
}

/// `maintenance_margin = position_value × mm_rate`, rounded up
pub fn maintenance_margin(position_value: Decimal, mm_rate: Decimal) -> Decimal {
    round_up(position_value * mm_rate)
}

/// `margin_ratio = equity / maintenance_margin`
///
/// None when there is no maintenance requirement (no open exposure).
/// Saturates at `Decimal::MAX` / `Decimal::MIN` instead of overflowing.
pub fn margin_ratio(equity: Decimal, maintenance_margin: Decimal) -> Option<Decimal> {
    if maintenance_margin <= Decimal::ZERO {
        return None;
    }
    let saturated = if equity.is_sign_negative() { Decimal::MIN } else { Decimal::MAX };
    Some(equity.checked_div(maintenance_margin).unwrap_or(saturated))
}

/// `available_margin = equity - margin_used`, rounded down
pub fn available_margin(equity: Decimal, margin_used: Decimal) -> Decimal {
    round_down(equity - margin_used)
}

pub fn is_leverage_valid(position_value: Decimal, requested_leverage: u8) -> bool {
    requested_leverage >= 1 && requested_leverage <= leverage_tier(position_value).max_leverage
}

const MARGIN_DP: u32 = 8;

fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MARGIN_DP, RoundingStrategy::AwayFromZero)
}

fn round_down(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MARGIN_DP, RoundingStrategy::ToZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_smallest_position() {
        let tier = leverage_tier(dec!(1_000));
        assert_eq!(tier.max_leverage, 125);
        assert_eq!(tier.im_rate, dec!(0.008));
        assert_eq!(tier.mm_rate, dec!(0.004));
    }

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (50_000, 125),
            (50_001, 100),
            (250_000, 100),
            (250_001, 50),
            (1_000_000, 50),
            (1_000_001, 20),
            (5_000_000, 20),
            (5_000_001, 10),
            (20_000_000, 10),
            (20_000_001, 5),
            (100_000_000, 5),
        ];
        for (value, leverage) in cases {
            assert_eq!(
                leverage_tier(Decimal::from(value)).max_leverage,
                leverage,
                "tier for {value}"
            );
        }
    }

    #[test]
    fn test_initial_margin() {
        assert_eq!(initial_margin(dec!(50_000), 10), dec!(5_000));
        assert_eq!(initial_margin(dec!(50_000), 1), dec!(50_000));
        assert_eq!(initial_margin(dec!(50_000), 125), dec!(400));
    }

    #[test]
    fn test_initial_margin_rounds_up() {
        // 100 / 3 = 33.333...
        assert_eq!(initial_margin(dec!(100), 3), dec!(33.33333334));
    }

    #[test]
    fn test_maintenance_margin() {
        assert_eq!(maintenance_margin(dec!(50_000), dec!(0.004)), dec!(200));
    }

    #[test]
    fn test_margin_ratio() {
        assert_eq!(margin_ratio(dec!(6_000), dec!(500)), Some(dec!(12)));
        assert_eq!(margin_ratio(dec!(5_000), Decimal::ZERO), None);
        assert_eq!(margin_ratio(dec!(1_000_000_000_000_000_000_000), dec!(0.00000001)), Some(Decimal::MAX));
        assert_eq!(margin_ratio(dec!(-1_000_000_000_000_000_000_000), dec!(0.00000001)), Some(Decimal::MIN));
    }

    #[test]
    fn test_available_margin_can_go_negative() {
        assert_eq!(available_margin(dec!(10_000), dec!(3_000)), dec!(7_000));
        assert!(available_margin(dec!(1_000), dec!(3_000)) < Decimal::ZERO);
    }

    #[test]
    fn test_leverage_validation() {
        assert!(is_leverage_valid(dec!(10_000), 125));
        assert!(!is_leverage_valid(dec!(100_000), 125));
        assert!(is_leverage_valid(dec!(100_000), 100));
        assert!(!is_leverage_valid(dec!(10_000), 0));
    }

    #[test]
    fn test_margin_hierarchy_all_tiers() {
        for v in [1_000, 50_000, 250_000, 1_000_000, 5_000_000, 20_000_000, 50_000_000] {
            let value = Decimal::from(v);
            let tier = leverage_tier(value);
            let im = initial_margin(value, tier.max_leverage);
            let mm = maintenance_margin(value, tier.mm_rate);
            assert!(mm < im, "mm {mm} >= im {im} at {v}");
            assert!(im < value);
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_max_leverage_margin_covers_maintenance(value in 1u64..100_000_000) {
            let value = Decimal::from(value);
            let tier = leverage_tier(value);
            let im = initial_margin(value, tier.max_leverage);
            let mm = maintenance_margin(value, tier.mm_rate);
            proptest::prop_assert!(im >= mm);
            proptest::prop_assert!(is_leverage_valid(value, tier.max_leverage));
            proptest::prop_assert!(!is_leverage_valid(value, tier.max_leverage.saturating_add(1)));
        }
    }
}
