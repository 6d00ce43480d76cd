//! Constant-product AMM pools with direct and two-hop route aggregation

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::info;
use types::dex::{LiquidityPosition, LiquidityWithdrawal, Pool, RouteHop, Swap, SwapQuote};
use types::ids::{LiquidityPositionId, PoolId, SwapId, TenantId, UserId};
use types::numeric::MAX_MAGNITUDE;

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

/// Amounts are kept to 8 decimal places and rounded toward zero
const SCALE: u32 = 8;
const BPS: Decimal = dec!(10000);

#[derive(Debug, Clone, PartialEq)]
pub struct NewPool {
    pub token_a: String,
    pub token_b: String,
    pub fee_bps: u32,
    pub initial_a: Decimal,
    pub initial_b: Decimal,
    pub created_by: UserId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: Decimal,
    pub min_amount_out: Decimal,
    pub recipient: String,
}

#[async_trait]
pub trait DexService: Send + Sync {
    async fn pools(&self) -> Vec<Pool>;

    async fn create_pool(&self, request: NewPool) -> PlatformResult<Pool>;

    async fn quote(&self, token_in: &str, token_out: &str, amount_in: Decimal) -> PlatformResult<SwapQuote>;

    async fn swap(&self, request: SwapRequest) -> PlatformResult<Swap>;

    async fn swaps(&self, user: &UserId) -> Vec<Swap>;

    async fn add_liquidity(
        &self,
        user: &UserId,
        pool_id: &PoolId,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> PlatformResult<LiquidityPosition>;

    async fn get_liquidity_position(&self, position_id: &LiquidityPositionId) -> PlatformResult<LiquidityPosition>;

    async fn withdraw_liquidity(
        &self,
        position_id: &LiquidityPositionId,
        share_bps: u32,
    ) -> PlatformResult<LiquidityWithdrawal>;

    async fn liquidity_positions(&self, user: &UserId) -> Vec<LiquidityPosition>;
}

fn round_down(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SCALE, RoundingStrategy::ToZero)
}

/// Positive and no larger than `MAX_MAGNITUDE`
fn ensure_amount(field: &str, value: Decimal) -> PlatformResult<()> {
    if value <= Decimal::ZERO {
        return Err(PlatformError::validation(format!("{field} must be positive")));
    }
    if value > MAX_MAGNITUDE {
        return Err(PlatformError::validation(format!("{field} must not exceed {MAX_MAGNITUDE}")));
    }
    Ok(())
}

/// `reserve + amount`, refused once a reserve would pass `MAX_MAGNITUDE`
fn grown_reserve(reserve: Decimal, amount: Decimal) -> PlatformResult<Decimal> {
    reserve
        .checked_add(amount)
        .filter(|r| *r <= MAX_MAGNITUDE)
        .ok_or_else(|| PlatformError::validation(format!("pool reserves must not exceed {MAX_MAGNITUDE}")))
}

/// `sqrt(a * b)` share count for a pool's first deposit
fn initial_shares(amount_a: Decimal, amount_b: Decimal) -> PlatformResult<Decimal> {
    amount_a
        .checked_mul(amount_b)
        .and_then(|k| k.sqrt())
        .map(|s| s.round_dp(SCALE))
        .ok_or_else(|| PlatformError::validation("deposit too large to mint shares"))
}

/// Output of one constant-product pool, rounded down. None on overflow.
pub fn amount_out(amount_in: Decimal, reserve_in: Decimal, reserve_out: Decimal, fee_bps: u32) -> Option<Decimal> {
    if amount_in <= Decimal::ZERO || reserve_in <= Decimal::ZERO || reserve_out <= Decimal::ZERO {
        return Some(Decimal::ZERO);
    }
    let effective_in = amount_in.checked_mul(BPS - Decimal::from(fee_bps))?.checked_div(BPS)?;
    let out = effective_in
        .checked_mul(reserve_out)?
        .checked_div(reserve_in.checked_add(effective_in)?)?;
    Some(round_down(out))
}

#[derive(Default)]
struct DexState {
    pools: BTreeMap<PoolId, Pool>,
    swaps: Vec<Swap>,
    positions: BTreeMap<LiquidityPositionId, LiquidityPosition>,
}

impl DexState {
    fn hop(&self, pool: &Pool, token_in: &str, amount_in: Decimal) -> Option<RouteHop> {
        let (reserve_in, reserve_out) = pool.reserves_for(token_in)?;
        let out = amount_out(amount_in, reserve_in, reserve_out, pool.fee_bps)?;
        Some(RouteHop {
            pool_id: pool.pool_id,
            token_in: token_in.to_string(),
            token_out: pool.counterpart(token_in)?.to_string(),
            amount_in,
            amount_out: out,
            fee: amount_in * Decimal::from(pool.fee_bps) / BPS,
        })
    }

    /// Best of the direct pool and every two-hop path
    fn best_route(&self, token_in: &str, token_out: &str, amount_in: Decimal) -> Option<Vec<RouteHop>> {
        let mut best: Option<Vec<RouteHop>> = None;
        let mut consider = |route: Vec<RouteHop>| {
            let out = route.last().map_or(Decimal::ZERO, |h| h.amount_out);
            let current = best
                .as_ref()
                .and_then(|r| r.last())
                .map_or(Decimal::ZERO, |h| h.amount_out);
            if out > current {
                best = Some(route);
            }
        };

        for first in self.pools.values().filter(|p| p.contains(token_in)) {
            let Some(mid) = first.counterpart(token_in) else { continue };
            let Some(hop1) = self.hop(first, token_in, amount_in) else { continue };
            if mid == token_out {
                consider(vec![hop1]);
                continue;
            }
            for second in self
                .pools
                .values()
                .filter(|p| p.pool_id != first.pool_id && p.contains(mid) && p.contains(token_out))
            {
                if let Some(hop2) = self.hop(second, mid, hop1.amount_out) {
                    consider(vec![hop1.clone(), hop2]);
                }
            }
        }
        best
    }

    fn quote(&self, token_in: &str, token_out: &str, amount_in: Decimal) -> PlatformResult<SwapQuote> {
        if token_in == token_out {
            return Err(PlatformError::validation("token_in and token_out must differ"));
        }
        ensure_amount("amount_in", amount_in)?;
        let hops = self
            .best_route(token_in, token_out, amount_in)
            .ok_or_else(|| PlatformError::not_found(format!("route {token_in} -> {token_out}")))?;
        let amount_out = hops.last().map_or(Decimal::ZERO, |h| h.amount_out);

        // output at the pre-trade spot prices with no fees
        let mut spot_out = amount_in;
        for hop in &hops {
            if let Some((r_in, r_out)) = self.pools.get(&hop.pool_id).and_then(|p| p.reserves_for(&hop.token_in)) {
                spot_out = spot_out
                    .checked_mul(r_out)
                    .and_then(|v| v.checked_div(r_in))
                    .ok_or_else(|| PlatformError::validation("amount_in too large for pool reserves"))?;
            }
        }
        let price_impact = if spot_out > Decimal::ZERO {
            ((spot_out - amount_out) / spot_out).round_dp(6)
        } else {
            Decimal::ZERO
        };

        Ok(SwapQuote {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out,
            hops,
            price_impact,
        })
    }
}

pub struct InMemoryDex {
    state: Mutex<DexState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDex {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(DexState::default()),
            clock,
        }
    }
}

#[async_trait]
impl DexService for InMemoryDex {
    async fn pools(&self) -> Vec<Pool> {
        self.state.lock().pools.values().cloned().collect()
    }

    async fn create_pool(&self, request: NewPool) -> PlatformResult<Pool> {
        if request.token_a == request.token_b {
            return Err(PlatformError::validation("pool tokens must differ"));
        }
        if !(1..=1000).contains(&request.fee_bps) {
            return Err(PlatformError::validation("fee_bps must be within 1..=1000"));
        }
        ensure_amount("initial_a", request.initial_a)?;
        ensure_amount("initial_b", request.initial_b)?;
        // canonical order: token_a < token_b
        let (token_a, token_b, reserve_a, reserve_b) = if request.token_a < request.token_b {
            (request.token_a, request.token_b, request.initial_a, request.initial_b)
        } else {
            (request.token_b, request.token_a, request.initial_b, request.initial_a)
        };

        let now = self.clock.now();
        let mut state = self.state.lock();
        if state
            .pools
            .values()
            .any(|p| p.token_a == token_a && p.token_b == token_b && p.fee_bps == request.fee_bps)
        {
            return Err(PlatformError::conflict(
                "POOL_EXISTS",
                format!("{token_a}/{token_b} pool with fee {} bps exists", request.fee_bps),
            ));
        }
        let shares = initial_shares(reserve_a, reserve_b)?;

        let pool = Pool {
            pool_id: PoolId::new(),
            token_a,
            token_b,
            reserve_a,
            reserve_b,
            fee_bps: request.fee_bps,
            total_shares: shares,
            created_at: now,
        };
        let position = LiquidityPosition {
            position_id: LiquidityPositionId::new(),
            user_id: request.created_by,
            pool_id: pool.pool_id,
            shares,
            created_at: now,
            updated_at: now,
        };
        info!(pool_id = %pool.pool_id, token_a = %pool.token_a, token_b = %pool.token_b, "pool created");
        state.positions.insert(position.position_id, position);
        state.pools.insert(pool.pool_id, pool.clone());
        Ok(pool)
    }

    async fn quote(&self, token_in: &str, token_out: &str, amount_in: Decimal) -> PlatformResult<SwapQuote> {
        self.state.lock().quote(token_in, token_out, amount_in)
    }

    async fn swap(&self, request: SwapRequest) -> PlatformResult<Swap> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let quote = state.quote(&request.token_in, &request.token_out, request.amount_in)?;
        if quote.amount_out < request.min_amount_out {
            return Err(PlatformError::conflict(
                "SLIPPAGE_EXCEEDED",
                format!("output {} below minimum {}", quote.amount_out, request.min_amount_out),
            ));
        }
        if quote.amount_out <= Decimal::ZERO {
            return Err(PlatformError::conflict("INSUFFICIENT_LIQUIDITY", "swap output rounds to zero"));
        }

        for hop in &quote.hops {
            let reserve_in = state
                .pools
                .get(&hop.pool_id)
                .and_then(|p| p.reserves_for(&hop.token_in))
                .map_or(Decimal::ZERO, |(r_in, _)| r_in);
            grown_reserve(reserve_in, hop.amount_in)?;
        }
        for hop in &quote.hops {
            let pool = state
                .pools
                .get_mut(&hop.pool_id)
                .ok_or_else(|| PlatformError::Internal(format!("pool {} vanished", hop.pool_id)))?;
            if pool.token_a == hop.token_in {
                pool.reserve_a += hop.amount_in;
                pool.reserve_b -= hop.amount_out;
            } else {
                pool.reserve_b += hop.amount_in;
                pool.reserve_a -= hop.amount_out;
            }
        }

        let swap = Swap {
            swap_id: SwapId::new(),
            user_id: request.user_id,
            tenant_id: request.tenant_id,
            token_in: quote.token_in,
            token_out: quote.token_out,
            amount_in: quote.amount_in,
            amount_out: quote.amount_out,
            route: quote.hops.iter().map(|h| h.pool_id).collect(),
            recipient: request.recipient,
            executed_at: now,
        };
        info!(
            swap_id = %swap.swap_id,
            user_id = %swap.user_id,
            hops = swap.route.len(),
            amount_in = %swap.amount_in,
            amount_out = %swap.amount_out,
            "swap executed"
        );
        state.swaps.push(swap.clone());
        Ok(swap)
    }

    async fn swaps(&self, user: &UserId) -> Vec<Swap> {
        self.state
            .lock()
            .swaps
            .iter()
            .filter(|s| &s.user_id == user)
            .cloned()
            .collect()
    }

    async fn add_liquidity(
        &self,
        user: &UserId,
        pool_id: &PoolId,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> PlatformResult<LiquidityPosition> {
        ensure_amount("amount_a", amount_a)?;
        ensure_amount("amount_b", amount_b)?;
        let now = self.clock.now();
        let mut state = self.state.lock();
        let pool = state
            .pools
            .get_mut(pool_id)
            .ok_or_else(|| PlatformError::not_found(format!("pool {pool_id}")))?;

        let reserve_a = grown_reserve(pool.reserve_a, amount_a)?;
        let reserve_b = grown_reserve(pool.reserve_b, amount_b)?;
        let minted = if pool.total_shares.is_zero() {
            initial_shares(amount_a, amount_b)?
        } else {
            let ratio = amount_a
                .checked_div(pool.reserve_a)
                .zip(amount_b.checked_div(pool.reserve_b))
                .map(|(ra, rb)| ra.min(rb));
            ratio
                .and_then(|r| r.checked_mul(pool.total_shares))
                .map(round_down)
                .ok_or_else(|| PlatformError::validation("deposit too large to mint shares"))?
        };
        if minted <= Decimal::ZERO {
            return Err(PlatformError::validation("deposit too small to mint shares"));
        }
        pool.reserve_a = reserve_a;
        pool.reserve_b = reserve_b;
        pool.total_shares += minted;

        let position = LiquidityPosition {
            position_id: LiquidityPositionId::new(),
            user_id: *user,
            pool_id: *pool_id,
            shares: minted,
            created_at: now,
            updated_at: now,
        };
        info!(pool_id = %pool_id, user_id = %user, shares = %minted, "liquidity added");
        state.positions.insert(position.position_id, position.clone());
        Ok(position)
    }

    async fn get_liquidity_position(&self, position_id: &LiquidityPositionId) -> PlatformResult<LiquidityPosition> {
        self.state
            .lock()
            .positions
            .get(position_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("liquidity position {position_id}")))
    }

    async fn withdraw_liquidity(
        &self,
        position_id: &LiquidityPositionId,
        share_bps: u32,
    ) -> PlatformResult<LiquidityWithdrawal> {
        if !(1..=10_000).contains(&share_bps) {
            return Err(PlatformError::validation("share_bps must be within 1..=10000"));
        }
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let DexState { pools, positions, .. } = &mut *guard;
        let position = positions
            .get_mut(position_id)
            .ok_or_else(|| PlatformError::not_found(format!("liquidity position {position_id}")))?;
        let pool = pools
            .get_mut(&position.pool_id)
            .ok_or_else(|| PlatformError::Internal(format!("pool {} vanished", position.pool_id)))?;

        let burned = if share_bps == 10_000 {
            position.shares
        } else {
            round_down(position.shares * Decimal::from(share_bps) / BPS)
        };
        if burned <= Decimal::ZERO || pool.total_shares <= Decimal::ZERO {
            return Err(PlatformError::validation("nothing to withdraw"));
        }
        let amount_a = round_down(pool.reserve_a * burned / pool.total_shares);
        let amount_b = round_down(pool.reserve_b * burned / pool.total_shares);
        pool.reserve_a -= amount_a;
        pool.reserve_b -= amount_b;
        pool.total_shares -= burned;
        position.shares -= burned;
        position.updated_at = now;

        info!(position_id = %position_id, shares = %burned, "liquidity withdrawn");
        Ok(LiquidityWithdrawal {
            position_id: *position_id,
            shares_burned: burned,
            amount_a,
            amount_b,
            remaining_shares: position.shares,
        })
    }

    async fn liquidity_positions(&self, user: &UserId) -> Vec<LiquidityPosition> {
        self.state
            .lock()
            .positions
            .values()
            .filter(|p| &p.user_id == user && !p.shares.is_zero())
            .cloned()
            .collect()
    }
}
