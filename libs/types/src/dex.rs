//! DEX pool, swap and liquidity types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{LiquidityPositionId, PoolId, SwapId, TenantId, UserId};

/// Constant-product liquidity pool. `token_a < token_b` lexicographically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub pool_id: PoolId,
    pub token_a: String,
    pub token_b: String,
    pub reserve_a: Decimal,
    pub reserve_b: Decimal,
    /// Swap fee in basis points
    pub fee_bps: u32,
    pub total_shares: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Pool {
    pub fn contains(&self, token: &str) -> bool {
        self.token_a == token || self.token_b == token
    }

    /// The other side of the pair
    pub fn counterpart(&self, token: &str) -> Option<&str> {
        if self.token_a == token {
            Some(&self.token_b)
        } else if self.token_b == token {
            Some(&self.token_a)
        } else {
            None
        }
    }

    /// (reserve_in, reserve_out) for a swap starting with `token_in`
    pub fn reserves_for(&self, token_in: &str) -> Option<(Decimal, Decimal)> {
        if self.token_a == token_in {
            Some((self.reserve_a, self.reserve_b))
        } else if self.token_b == token_in {
            Some((self.reserve_b, self.reserve_a))
        } else {
            None
        }
    }

    /// Constant product `k`, None when it exceeds `Decimal`'s range
    pub fn invariant(&self) -> Option<Decimal> {
        self.reserve_a.checked_mul(self.reserve_b)
    }
}

/// One pool traversal of a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteHop {
    pub pool_id: PoolId,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub hops: Vec<RouteHop>,
    /// Relative shortfall versus the pre-trade spot price
    pub price_impact: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swap {
    pub swap_id: SwapId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    pub route: Vec<PoolId>,
    pub recipient: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub position_id: LiquidityPositionId,
    pub user_id: UserId,
    pub pool_id: PoolId,
    pub shares: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Tokens returned by a liquidity withdrawal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityWithdrawal {
    pub position_id: LiquidityPositionId,
    pub shares_burned: Decimal,
    pub amount_a: Decimal,
    pub amount_b: Decimal,
    pub remaining_shares: Decimal,
}
