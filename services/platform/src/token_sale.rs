//! Presale phases, investments and linear vesting with a TGE unlock

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::info;
use types::ids::{InvestmentId, PhaseId, TenantId, UserId};
use types::token_sale::{
    Investment, MAX_VESTING_DAYS, PhaseStatus, PhaseView, PresalePhase, VestingStatus, VestingTerms,
};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

const TOKEN_SCALE: u32 = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct NewPhase {
    pub tenant_id: TenantId,
    pub name: String,
    pub token_price: Decimal,
    pub token_allocation: Decimal,
    pub min_purchase: Decimal,
    pub max_purchase: Decimal,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub vesting: VestingTerms,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub phase_id: PhaseId,
    pub amount: Decimal,
    pub wallet_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimReceipt {
    pub investment_id: InvestmentId,
    pub tokens_released: Decimal,
    pub vesting: VestingStatus,
}

#[async_trait]
pub trait TokenSaleService: Send + Sync {
    async fn phases(&self, tenant: &TenantId) -> Vec<PhaseView>;

    async fn create_phase(&self, phase: NewPhase) -> PlatformResult<PhaseView>;

    async fn invest(&self, request: NewInvestment) -> PlatformResult<Investment>;

    async fn investments(&self, user: &UserId) -> Vec<Investment>;

    async fn get_investment(&self, investment_id: &InvestmentId) -> PlatformResult<Investment>;

    async fn vesting(&self, investment_id: &InvestmentId) -> PlatformResult<VestingStatus>;

    /// Releases everything vested and not yet claimed
    async fn claim(&self, investment_id: &InvestmentId) -> PlatformResult<ClaimReceipt>;
}

fn view(phase: &PresalePhase, now: DateTime<Utc>) -> PhaseView {
    PhaseView {
        phase: phase.clone(),
        status: phase.status_at(now),
        tokens_remaining: phase.remaining(),
    }
}

fn validate_phase(phase: &NewPhase) -> PlatformResult<()> {
    if phase.name.trim().is_empty() {
        return Err(PlatformError::validation("name must not be empty"));
    }
    if phase.token_price <= Decimal::ZERO {
        return Err(PlatformError::validation("token_price must be positive"));
    }
    if phase.token_allocation <= Decimal::ZERO {
        return Err(PlatformError::validation("token_allocation must be positive"));
    }
    if phase.min_purchase <= Decimal::ZERO || phase.min_purchase > phase.max_purchase {
        return Err(PlatformError::validation(
            "min_purchase must be positive and not exceed max_purchase",
        ));
    }
    if phase.starts_at >= phase.ends_at {
        return Err(PlatformError::validation("starts_at must precede ends_at"));
    }
    if !phase.vesting.within_bounds() {
        return Err(PlatformError::validation(format!(
            "vesting cliff_days and duration_days must not exceed {MAX_VESTING_DAYS}"
        )));
    }
    if phase.vesting.tge_percent < Decimal::ZERO || phase.vesting.tge_percent > dec!(100) {
        return Err(PlatformError::validation("vesting.tge_percent must be within 0..=100"));
    }
    Ok(())
}

fn vesting_status(phase: &PresalePhase, investment: &Investment, now: DateTime<Utc>) -> VestingStatus {
    let tge = phase.ends_at;
    let fraction = phase.vesting.vested_fraction(tge, now);
    let vested = (investment.token_amount * fraction)
        .round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::ToZero)
        .min(investment.token_amount);
    VestingStatus {
        investment_id: investment.investment_id,
        total_tokens: investment.token_amount,
        vested_tokens: vested,
        claimed_tokens: investment.tokens_claimed,
        claimable_tokens: (vested - investment.tokens_claimed).max(Decimal::ZERO),
        tge_at: tge,
        fully_vested_at: phase.vesting.fully_vested_at(tge).unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

#[derive(Default)]
struct SaleState {
    phases: BTreeMap<PhaseId, PresalePhase>,
    investments: BTreeMap<InvestmentId, Investment>,
}

pub struct InMemoryTokenSale {
    state: Mutex<SaleState>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTokenSale {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(SaleState::default()),
            clock,
        }
    }
}

#[async_trait]
impl TokenSaleService for InMemoryTokenSale {
    async fn phases(&self, tenant: &TenantId) -> Vec<PhaseView> {
        let now = self.clock.now();
        self.state
            .lock()
            .phases
            .values()
            .filter(|p| &p.tenant_id == tenant)
            .map(|p| view(p, now))
            .collect()
    }

    async fn create_phase(&self, phase: NewPhase) -> PlatformResult<PhaseView> {
        validate_phase(&phase)?;
        let record = PresalePhase {
            phase_id: PhaseId::new(),
            tenant_id: phase.tenant_id,
            name: phase.name,
            token_price: phase.token_price,
            token_allocation: phase.token_allocation,
            tokens_sold: Decimal::ZERO,
            min_purchase: phase.min_purchase,
            max_purchase: phase.max_purchase,
            starts_at: phase.starts_at,
            ends_at: phase.ends_at,
            vesting: phase.vesting,
        };
        info!(phase_id = %record.phase_id, tenant_id = %record.tenant_id, name = %record.name, "presale phase created");
        let out = view(&record, self.clock.now());
        self.state.lock().phases.insert(record.phase_id, record);
        Ok(out)
    }

    async fn invest(&self, request: NewInvestment) -> PlatformResult<Investment> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let SaleState { phases, investments } = &mut *guard;
        let phase = phases
            .get_mut(&request.phase_id)
            .filter(|p| p.tenant_id == request.tenant_id)
            .ok_or_else(|| PlatformError::not_found(format!("phase {}", request.phase_id)))?;

        let status = phase.status_at(now);
        if status != PhaseStatus::Active {
            return Err(PlatformError::conflict(
                "PHASE_NOT_ACTIVE",
                format!("phase is not active ({status:?})"),
            ));
        }
        if request.amount < phase.min_purchase || request.amount > phase.max_purchase {
            return Err(PlatformError::validation(format!(
                "amount must be within {}..={}",
                phase.min_purchase, phase.max_purchase
            )));
        }
        let invested: Decimal = investments
            .values()
            .filter(|i| i.phase_id == phase.phase_id && i.user_id == request.user_id)
            .map(|i| i.quote_amount)
            .sum();
        if invested + request.amount > phase.max_purchase {
            return Err(PlatformError::conflict(
                "PURCHASE_LIMIT_EXCEEDED",
                format!("cumulative purchase would exceed {}", phase.max_purchase),
            ));
        }

        let tokens = request
            .amount
            .checked_div(phase.token_price)
            .ok_or_else(|| PlatformError::validation("amount is too large for the token price"))?
            .round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::ToZero);
        if tokens > phase.remaining() {
            return Err(PlatformError::conflict(
                "ALLOCATION_EXCEEDED",
                format!("only {} tokens remain", phase.remaining()),
            ));
        }
        phase.tokens_sold += tokens;

        let investment = Investment {
            investment_id: InvestmentId::new(),
            phase_id: phase.phase_id,
            user_id: request.user_id,
            tenant_id: request.tenant_id,
            quote_amount: request.amount,
            token_amount: tokens,
            wallet_address: request.wallet_address,
            tokens_claimed: Decimal::ZERO,
            invested_at: now,
        };
        info!(
            investment_id = %investment.investment_id,
            phase_id = %investment.phase_id,
            user_id = %investment.user_id,
            tokens = %tokens,
            "presale investment recorded"
        );
        investments.insert(investment.investment_id, investment.clone());
        Ok(investment)
    }

    async fn investments(&self, user: &UserId) -> Vec<Investment> {
        self.state
            .lock()
            .investments
            .values()
            .filter(|i| &i.user_id == user)
            .cloned()
            .collect()
    }

    async fn get_investment(&self, investment_id: &InvestmentId) -> PlatformResult<Investment> {
        self.state
            .lock()
            .investments
            .get(investment_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("investment {investment_id}")))
    }

    async fn vesting(&self, investment_id: &InvestmentId) -> PlatformResult<VestingStatus> {
        let now = self.clock.now();
        let state = self.state.lock();
        let investment = state
            .investments
            .get(investment_id)
            .ok_or_else(|| PlatformError::not_found(format!("investment {investment_id}")))?;
        let phase = state
            .phases
            .get(&investment.phase_id)
            .ok_or_else(|| PlatformError::Internal(format!("phase {} missing", investment.phase_id)))?;
        Ok(vesting_status(phase, investment, now))
    }

    async fn claim(&self, investment_id: &InvestmentId) -> PlatformResult<ClaimReceipt> {
        let now = self.clock.now();
        let mut guard = self.state.lock();
        let SaleState { phases, investments } = &mut *guard;
        let investment = investments
            .get_mut(investment_id)
            .ok_or_else(|| PlatformError::not_found(format!("investment {investment_id}")))?;
        let phase = phases
            .get(&investment.phase_id)
            .ok_or_else(|| PlatformError::Internal(format!("phase {} missing", investment.phase_id)))?;

        let before = vesting_status(phase, investment, now);
        if before.claimable_tokens <= Decimal::ZERO {
            return Err(PlatformError::conflict("NOTHING_TO_CLAIM", "no vested tokens to claim"));
        }
        investment.tokens_claimed += before.claimable_tokens;
        info!(
            investment_id = %investment_id,
            released = %before.claimable_tokens,
            "vested tokens claimed"
        );
        Ok(ClaimReceipt {
            investment_id: *investment_id,
            tokens_released: before.claimable_tokens,
            vesting: vesting_status(phase, investment, now),
        })
    }
}
