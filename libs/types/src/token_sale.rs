//! Token sale (presale) types and vesting arithmetic

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ids::{InvestmentId, PhaseId, TenantId, UserId};

/// Upper bound for `cliff_days` and `duration_days`
pub const MAX_VESTING_DAYS: u32 = 3650;

/// Unlock schedule applied to tokens bought in a phase
///
/// `tge_percent` unlocks at the phase end (TGE). The remainder vests
/// linearly over `duration_days`, starting `cliff_days` after TGE.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VestingTerms {
    pub tge_percent: Decimal,
    pub cliff_days: u32,
    pub duration_days: u32,
}

impl VestingTerms {
    /// Day counts within `0..=MAX_VESTING_DAYS`
    pub fn within_bounds(&self) -> bool {
        self.cliff_days <= MAX_VESTING_DAYS && self.duration_days <= MAX_VESTING_DAYS
    }

    /// End of the linear schedule, None past the representable range
    pub fn fully_vested_at(&self, tge: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = i64::from(self.cliff_days) + i64::from(self.duration_days);
        tge.checked_add_signed(Duration::days(days))
    }

    /// Fraction of the allocation unlocked at `now`, in [0, 1]
    pub fn vested_fraction(&self, tge: DateTime<Utc>, now: DateTime<Utc>) -> Decimal {
        if now < tge {
            return Decimal::ZERO;
        }
        let tge_fraction = (self.tge_percent / dec!(100)).clamp(Decimal::ZERO, Decimal::ONE);
        let Some(linear_start) = tge.checked_add_signed(Duration::days(i64::from(self.cliff_days))) else {
            return tge_fraction;
        };
        if now < linear_start {
            return tge_fraction;
        }
        if self.duration_days == 0 {
            return Decimal::ONE;
        }
        let elapsed = Decimal::from((now - linear_start).num_seconds());
        let total = Decimal::from(i64::from(self.duration_days) * 86_400);
        let linear = (elapsed / total).min(Decimal::ONE);
        (tge_fraction + (Decimal::ONE - tge_fraction) * linear).min(Decimal::ONE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Scheduled,
    Active,
    SoldOut,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresalePhase {
    pub phase_id: PhaseId,
    pub tenant_id: TenantId,
    pub name: String,
    /// Quote currency per token
    pub token_price: Decimal,
    pub token_allocation: Decimal,
    pub tokens_sold: Decimal,
    /// Quote-currency bounds per purchase (and per user cumulative max)
    pub min_purchase: Decimal,
    pub max_purchase: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub vesting: VestingTerms,
}

impl PresalePhase {
    pub fn status_at(&self, now: DateTime<Utc>) -> PhaseStatus {
        if now < self.starts_at {
            PhaseStatus::Scheduled
        } else if now >= self.ends_at {
            PhaseStatus::Ended
        } else if self.remaining() <= Decimal::ZERO {
            PhaseStatus::SoldOut
        } else {
            PhaseStatus::Active
        }
    }

    pub fn remaining(&self) -> Decimal {
        (self.token_allocation - self.tokens_sold).max(Decimal::ZERO)
    }
}

/// Phase plus derived status, as served to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseView {
    #[serde(flatten)]
    pub phase: PresalePhase,
    pub status: PhaseStatus,
    pub tokens_remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub investment_id: InvestmentId,
    pub phase_id: PhaseId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub quote_amount: Decimal,
    pub token_amount: Decimal,
    pub wallet_address: String,
    pub tokens_claimed: Decimal,
    pub invested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingStatus {
    pub investment_id: InvestmentId,
    pub total_tokens: Decimal,
    pub vested_tokens: Decimal,
    pub claimed_tokens: Decimal,
    pub claimable_tokens: Decimal,
    pub tge_at: DateTime<Utc>,
    pub fully_vested_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn terms() -> VestingTerms {
        VestingTerms {
            tge_percent: dec!(10),
            cliff_days: 30,
            duration_days: 90,
        }
    }

    #[test]
    fn test_vesting_curve() {
        let tge = Utc::now();
        let t = terms();
        assert_eq!(t.vested_fraction(tge, tge - Duration::days(1)), Decimal::ZERO);
        assert_eq!(t.vested_fraction(tge, tge), dec!(0.1));
        assert_eq!(t.vested_fraction(tge, tge + Duration::days(29)), dec!(0.1));
        let halfway = t.vested_fraction(tge, tge + Duration::days(30 + 45));
        assert_eq!(halfway, dec!(0.55));
        assert_eq!(t.vested_fraction(tge, tge + Duration::days(500)), Decimal::ONE);
    }

    #[test]
    fn test_zero_duration_unlocks_after_cliff() {
        let tge = Utc::now();
        let t = VestingTerms {
            tge_percent: dec!(0),
            cliff_days: 10,
            duration_days: 0,
        };
        assert_eq!(t.vested_fraction(tge, tge + Duration::days(5)), Decimal::ZERO);
        assert_eq!(t.vested_fraction(tge, tge + Duration::days(10)), Decimal::ONE);
    }

    #[test]
    fn test_unrepresentable_cliff_stays_at_tge_unlock() {
        let tge = Utc::now();
        let t = VestingTerms {
            tge_percent: dec!(25),
            cliff_days: u32::MAX,
            duration_days: u32::MAX,
        };
        assert!(!t.within_bounds());
        assert_eq!(t.vested_fraction(tge, tge + Duration::days(1)), dec!(0.25));
        assert_eq!(t.fully_vested_at(tge), None);
        assert_eq!(terms().fully_vested_at(tge), Some(tge + Duration::days(120)));
    }

    proptest! {
        #[test]
        fn prop_vesting_is_monotonic_and_bounded(a in 0i64..400, b in 0i64..400) {
            let tge = Utc::now();
            let t = terms();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let f_lo = t.vested_fraction(tge, tge + Duration::days(lo));
            let f_hi = t.vested_fraction(tge, tge + Duration::days(hi));
            prop_assert!(f_lo <= f_hi);
            prop_assert!(f_hi <= Decimal::ONE);
            prop_assert!(f_lo >= Decimal::ZERO);
        }
    }
}
