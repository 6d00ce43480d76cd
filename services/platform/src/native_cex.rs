//! Native CEX: spot orders with tiered fees, THAL fee discounts, staking
//! and maker rewards
//!
//! Orders are forwarded to an [`ExchangeService`]. Fees are settled per
//! trade for both sides once the engine reports the fills.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::{debug, info};
use types::fee::{fee_tier_for, FeeSchedule, ThalAccount, MAKER_REWARD_RATE, THAL_FEE_DISCOUNT};
use types::ids::{TradeId, UserId};
use types::order::{NewOrder, Order};
use types::trade::Trade;

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};
use crate::exchange::ExchangeService;

pub const THAL: &str = "THAL";
pub const VOLUME_WINDOW_DAYS: i64 = 30;
const THAL_SCALE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Liquidity {
    Maker,
    Taker,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeeCharge {
    pub trade_id: TradeId,
    pub user_id: UserId,
    pub liquidity: Liquidity,
    pub notional: Decimal,
    pub fee_rate: Decimal,
    /// THAL or the market's quote asset
    pub asset: String,
    pub amount: Decimal,
    /// Maker reward credited in THAL
    pub reward: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CexExecution {
    pub order: Order,
    pub trades: Vec<Trade>,
    pub fees: Vec<FeeCharge>,
}

#[async_trait]
pub trait NativeCexService: Send + Sync {
    async fn fee_schedule(&self, user: &UserId) -> FeeSchedule;

    /// `pay_fees_in_thal` is remembered for fills where the user is maker
    async fn place_order(&self, order: NewOrder, pay_fees_in_thal: bool) -> PlatformResult<CexExecution>;

    async fn credit_thal(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount>;

    async fn stake(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount>;

    async fn unstake(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount>;

    async fn thal_account(&self, user: &UserId) -> ThalAccount;
}

struct Ledger {
    account: ThalAccount,
    volume: VecDeque<(DateTime<Utc>, Decimal)>,
    pay_in_thal: bool,
}

impl Ledger {
    fn new(user: UserId) -> Self {
        Self {
            account: ThalAccount::new(user),
            volume: VecDeque::new(),
            pay_in_thal: false,
        }
    }

    /// Drops fills older than the window and refreshes `volume_30d`
    fn roll(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::days(VOLUME_WINDOW_DAYS);
        while self.volume.front().is_some_and(|(at, _)| *at < cutoff) {
            self.volume.pop_front();
        }
        self.account.volume_30d = self.volume.iter().fold(Decimal::ZERO, |acc, (_, v)| acc.saturating_add(*v));
    }
}

pub struct InMemoryNativeCex {
    exchange: Arc<dyn ExchangeService>,
    ledgers: Mutex<HashMap<UserId, Ledger>>,
    thal_reference_price: Decimal,
    clock: Arc<dyn Clock>,
}

impl InMemoryNativeCex {
    /// `thal_reference_price` is quote (USDT) per THAL and must be positive
    pub fn new(
        exchange: Arc<dyn ExchangeService>,
        thal_reference_price: Decimal,
        clock: Arc<dyn Clock>,
    ) -> PlatformResult<Self> {
        if thal_reference_price <= Decimal::ZERO {
            return Err(PlatformError::validation("THAL reference price must be positive"));
        }
        Ok(Self {
            exchange,
            ledgers: Mutex::new(HashMap::new()),
            thal_reference_price,
            clock,
        })
    }

    fn to_thal(&self, quote: Decimal) -> Decimal {
        quote
            .checked_div(self.thal_reference_price)
            .unwrap_or(Decimal::MAX)
            .round_dp_with_strategy(THAL_SCALE, RoundingStrategy::ToZero)
    }

    fn settle(&self, ledger: &mut Ledger, trade: &Trade, liquidity: Liquidity, now: DateTime<Utc>) -> FeeCharge {
        ledger.roll(now);
        let notional = trade.notional();
        let tier = fee_tier_for(ledger.account.volume_30d, ledger.account.staked);
        let (fee_rate, fee_quote) = match liquidity {
            Liquidity::Maker => (tier.maker_rate, tier.maker_fee(notional)),
            Liquidity::Taker => (tier.taker_rate, tier.taker_fee(notional)),
        };

        let thal_fee = self.to_thal(fee_quote * (Decimal::ONE - THAL_FEE_DISCOUNT));
        let (asset, amount) = if ledger.pay_in_thal && ledger.account.balance >= thal_fee {
            ledger.account.balance -= thal_fee;
            ledger.account.fees_paid_thal += thal_fee;
            (THAL.to_string(), thal_fee)
        } else {
            ledger.account.fees_paid_quote = ledger.account.fees_paid_quote.saturating_add(fee_quote);
            (trade.symbol.quote().to_string(), fee_quote)
        };

        let reward = match liquidity {
            Liquidity::Maker => self.to_thal(notional * MAKER_REWARD_RATE),
            Liquidity::Taker => Decimal::ZERO,
        };
        ledger.account.balance = ledger.account.balance.saturating_add(reward);
        ledger.account.rewards_earned = ledger.account.rewards_earned.saturating_add(reward);

        ledger.volume.push_back((now, notional));
        ledger.account.volume_30d = ledger.account.volume_30d.saturating_add(notional);

        debug!(
            trade_id = %trade.trade_id,
            user_id = %ledger.account.user_id,
            ?liquidity,
            tier = tier.tier,
            %asset,
            %amount,
            "fee charged"
        );
        FeeCharge {
            trade_id: trade.trade_id,
            user_id: ledger.account.user_id,
            liquidity,
            notional,
            fee_rate,
            asset,
            amount,
            reward,
        }
    }
}

fn ensure_positive(amount: Decimal) -> PlatformResult<()> {
    if amount <= Decimal::ZERO {
        return Err(PlatformError::validation("amount must be positive"));
    }
    Ok(())
}

#[async_trait]
impl NativeCexService for InMemoryNativeCex {
    async fn fee_schedule(&self, user: &UserId) -> FeeSchedule {
        let now = self.clock.now();
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(*user).or_insert_with(|| Ledger::new(*user));
        ledger.roll(now);
        let tier = fee_tier_for(ledger.account.volume_30d, ledger.account.staked);
        let discounted = Decimal::ONE - THAL_FEE_DISCOUNT;
        FeeSchedule {
            tier,
            volume_30d: ledger.account.volume_30d,
            thal_staked: ledger.account.staked,
            thal_discount: THAL_FEE_DISCOUNT,
            maker_rate_in_thal: tier.maker_rate * discounted,
            taker_rate_in_thal: tier.taker_rate * discounted,
        }
    }

    async fn place_order(&self, order: NewOrder, pay_fees_in_thal: bool) -> PlatformResult<CexExecution> {
        let taker = order.user_id;
        self.ledgers
            .lock()
            .entry(taker)
            .or_insert_with(|| Ledger::new(taker))
            .pay_in_thal = pay_fees_in_thal;

        let report = self.exchange.place_order(order).await?;

        let now = self.clock.now();
        let mut ledgers = self.ledgers.lock();
        let mut fees = Vec::with_capacity(report.trades.len() * 2);
        for trade in &report.trades {
            let maker = ledgers
                .entry(trade.maker_user_id)
                .or_insert_with(|| Ledger::new(trade.maker_user_id));
            fees.push(self.settle(maker, trade, Liquidity::Maker, now));
            let taker = ledgers
                .entry(trade.taker_user_id)
                .or_insert_with(|| Ledger::new(trade.taker_user_id));
            fees.push(self.settle(taker, trade, Liquidity::Taker, now));
        }

        info!(
            order_id = %report.order.order_id,
            trades = report.trades.len(),
            pay_fees_in_thal,
            "cex order executed"
        );
        Ok(CexExecution {
            order: report.order,
            trades: report.trades,
            fees,
        })
    }

    async fn credit_thal(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount> {
        ensure_positive(amount)?;
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(*user).or_insert_with(|| Ledger::new(*user));
        ledger.account.balance += amount;
        info!(user_id = %user, %amount, "THAL credited");
        Ok(ledger.account.clone())
    }

    async fn stake(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount> {
        ensure_positive(amount)?;
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(*user).or_insert_with(|| Ledger::new(*user));
        if ledger.account.balance < amount {
            return Err(PlatformError::InsufficientFunds(format!(
                "THAL balance {} below {amount}",
                ledger.account.balance
            )));
        }
        ledger.account.balance -= amount;
        ledger.account.staked += amount;
        info!(user_id = %user, %amount, staked = %ledger.account.staked, "THAL staked");
        Ok(ledger.account.clone())
    }

    async fn unstake(&self, user: &UserId, amount: Decimal) -> PlatformResult<ThalAccount> {
        ensure_positive(amount)?;
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(*user).or_insert_with(|| Ledger::new(*user));
        if ledger.account.staked < amount {
            return Err(PlatformError::InsufficientFunds(format!(
                "staked THAL {} below {amount}",
                ledger.account.staked
            )));
        }
        ledger.account.staked -= amount;
        ledger.account.balance += amount;
        info!(user_id = %user, %amount, staked = %ledger.account.staked, "THAL unstaked");
        Ok(ledger.account.clone())
    }

    async fn thal_account(&self, user: &UserId) -> ThalAccount {
        let now = self.clock.now();
        let mut ledgers = self.ledgers.lock();
        let ledger = ledgers.entry(*user).or_insert_with(|| Ledger::new(*user));
        ledger.roll(now);
        ledger.account.clone()
    }
}
