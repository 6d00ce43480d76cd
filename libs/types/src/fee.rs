//! Native CEX fee tiers and THAL token accounts

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Fee tier, qualified by 30-day volume OR THAL staked
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    pub tier: u8,
    /// 30-day quote volume threshold
    pub volume_threshold: Decimal,
    /// THAL staked threshold
    pub thal_threshold: Decimal,
    pub maker_rate: Decimal,
    pub taker_rate: Decimal,
}

impl FeeTier {
    pub fn maker_fee(&self, notional: Decimal) -> Decimal {
        notional * self.maker_rate
    }

    pub fn taker_fee(&self, notional: Decimal) -> Decimal {
        notional * self.taker_rate
    }
}

/// Discount applied when fees are paid in THAL
pub const THAL_FEE_DISCOUNT: Decimal = dec!(0.25);

/// Maker incentive, as a fraction of maker notional paid in THAL value
pub const MAKER_REWARD_RATE: Decimal = dec!(0.0001);

/// Standard fee tiers, ascending
pub fn default_fee_tiers() -> [FeeTier; 4] {
    [
        FeeTier {
            tier: 0,
            volume_threshold: dec!(0),
            thal_threshold: dec!(0),
            maker_rate: dec!(0.0010),
            taker_rate: dec!(0.0010),
        },
        FeeTier {
            tier: 1,
            volume_threshold: dec!(100_000),
            thal_threshold: dec!(1_000),
            maker_rate: dec!(0.0008),
            taker_rate: dec!(0.0009),
        },
        FeeTier {
            tier: 2,
            volume_threshold: dec!(1_000_000),
            thal_threshold: dec!(10_000),
            maker_rate: dec!(0.0006),
            taker_rate: dec!(0.0008),
        },
        FeeTier {
            tier: 3,
            volume_threshold: dec!(10_000_000),
            thal_threshold: dec!(100_000),
            maker_rate: dec!(0.0002),
            taker_rate: dec!(0.0005),
        },
    ]
}

/// Highest tier whose volume OR staking threshold is met
pub fn fee_tier_for(volume_30d: Decimal, thal_staked: Decimal) -> FeeTier {
    let tiers = default_fee_tiers();
    tiers
        .iter()
        .rev()
        .find(|t| volume_30d >= t.volume_threshold || thal_staked >= t.thal_threshold)
        .copied()
        .unwrap_or(tiers[0])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThalAccount {
    pub user_id: UserId,
    pub balance: Decimal,
    pub staked: Decimal,
    pub rewards_earned: Decimal,
    pub volume_30d: Decimal,
    pub fees_paid_quote: Decimal,
    pub fees_paid_thal: Decimal,
}

impl ThalAccount {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            balance: Decimal::ZERO,
            staked: Decimal::ZERO,
            rewards_earned: Decimal::ZERO,
            volume_30d: Decimal::ZERO,
            fees_paid_quote: Decimal::ZERO,
            fees_paid_thal: Decimal::ZERO,
        }
    }
}

/// Effective schedule for one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub tier: FeeTier,
    pub volume_30d: Decimal,
    pub thal_staked: Decimal,
    pub thal_discount: Decimal,
    pub maker_rate_in_thal: Decimal,
    pub taker_rate_in_thal: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_by_volume() {
        assert_eq!(fee_tier_for(dec!(0), dec!(0)).tier, 0);
        assert_eq!(fee_tier_for(dec!(99_999), dec!(0)).tier, 0);
        assert_eq!(fee_tier_for(dec!(100_000), dec!(0)).tier, 1);
        assert_eq!(fee_tier_for(dec!(50_000_000), dec!(0)).tier, 3);
    }

    #[test]
    fn test_tier_by_staking() {
        assert_eq!(fee_tier_for(dec!(0), dec!(10_000)).tier, 2);
        assert_eq!(fee_tier_for(dec!(200_000), dec!(10_000)).tier, 2);
        assert_eq!(fee_tier_for(dec!(2_000_000), dec!(1_000)).tier, 2);
    }

    #[test]
    fn test_fee_amounts() {
        let tier = fee_tier_for(dec!(0), dec!(0));
        assert_eq!(tier.taker_fee(dec!(1000)), dec!(1.0000));
    }
}
