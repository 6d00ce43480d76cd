//! Isolated-account margin trading over the risk engine
//!
//! Collateral is quote currency. Realized PnL folds into collateral and a
//! liquidation never takes collateral below zero.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use risk_engine::RiskEngine;
use risk_engine::liquidation::should_liquidate;
use rust_decimal::Decimal;
use tracing::{info, warn};
use types::ids::{MarketId, PositionId, TenantId, UserId};
use types::margin::{AccountHealth, MarginAccount, Position, PositionSide, PositionStatus};
use types::numeric::{Price, Quantity};

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub symbol: MarketId,
    pub side: PositionSide,
    pub size: Quantity,
    pub leverage: u8,
    pub entry_price: Price,
}

#[async_trait]
pub trait MarginService: Send + Sync {
    /// Created on first access
    async fn account(&self, user: &UserId, tenant: &TenantId) -> MarginAccount;

    async fn deposit(&self, user: &UserId, tenant: &TenantId, amount: Decimal) -> PlatformResult<MarginAccount>;

    /// Bounded by available margin
    async fn withdraw(&self, user: &UserId, tenant: &TenantId, amount: Decimal) -> PlatformResult<MarginAccount>;

    async fn open_position(&self, request: OpenPosition) -> PlatformResult<Position>;

    async fn positions(&self, user: &UserId, include_closed: bool) -> Vec<Position>;

    async fn get_position(&self, position_id: &PositionId) -> PlatformResult<Position>;

    async fn close_position(&self, position_id: &PositionId, exit_price: Price) -> PlatformResult<Position>;

    /// Re-marks every open position on `symbol`; returns the positions
    /// liquidated as a result.
    async fn update_mark_price(&self, symbol: &MarketId, price: Price) -> PlatformResult<Vec<Position>>;

    async fn health(&self, user: &UserId, tenant: &TenantId) -> AccountHealth;
}

#[derive(Default)]
struct MarginBook {
    accounts: HashMap<UserId, MarginAccount>,
    positions: BTreeMap<PositionId, Position>,
}

impl MarginBook {
    fn account_mut(&mut self, user: &UserId, tenant: &TenantId, now: chrono::DateTime<chrono::Utc>) -> &mut MarginAccount {
        self.accounts.entry(*user).or_insert_with(|| MarginAccount {
            user_id: *user,
            tenant_id: tenant.clone(),
            collateral: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        })
    }

    fn open_positions(&self, user: &UserId) -> Vec<Position> {
        self.positions
            .values()
            .filter(|p| &p.user_id == user && p.is_open())
            .cloned()
            .collect()
    }

    fn collateral(&self, user: &UserId) -> Decimal {
        self.accounts.get(user).map_or(Decimal::ZERO, |a| a.collateral)
    }
}

pub struct InMemoryMargin {
    book: Mutex<MarginBook>,
    risk: RiskEngine,
    clock: Arc<dyn Clock>,
}

impl InMemoryMargin {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            book: Mutex::new(MarginBook::default()),
            risk: RiskEngine::new(),
            clock,
        }
    }
}

/// Realize `pnl` against `account`, flooring collateral at zero
fn settle(account: &mut MarginAccount, pnl: Decimal, now: chrono::DateTime<chrono::Utc>) {
    account.collateral = (account.collateral + pnl).max(Decimal::ZERO);
    account.updated_at = now;
}

#[async_trait]
impl MarginService for InMemoryMargin {
    async fn account(&self, user: &UserId, tenant: &TenantId) -> MarginAccount {
        let now = self.clock.now();
        self.book.lock().account_mut(user, tenant, now).clone()
    }

    async fn deposit(&self, user: &UserId, tenant: &TenantId, amount: Decimal) -> PlatformResult<MarginAccount> {
        if amount <= Decimal::ZERO {
            return Err(PlatformError::validation("amount must be positive"));
        }
        let now = self.clock.now();
        let mut book = self.book.lock();
        let account = book.account_mut(user, tenant, now);
        account.collateral += amount;
        account.updated_at = now;
        info!(user_id = %user, %amount, "margin deposit");
        Ok(account.clone())
    }

    async fn withdraw(&self, user: &UserId, tenant: &TenantId, amount: Decimal) -> PlatformResult<MarginAccount> {
        if amount <= Decimal::ZERO {
            return Err(PlatformError::validation("amount must be positive"));
        }
        let now = self.clock.now();
        let mut book = self.book.lock();
        let open = book.open_positions(user);
        let withdrawable = self.risk.withdrawable(book.collateral(user), &open);
        if amount > withdrawable {
            return Err(PlatformError::InsufficientFunds(format!(
                "requested {amount}, withdrawable {withdrawable}"
            )));
        }
        let account = book.account_mut(user, tenant, now);
        account.collateral -= amount;
        account.updated_at = now;
        info!(user_id = %user, %amount, "margin withdrawal");
        Ok(account.clone())
    }

    async fn open_position(&self, request: OpenPosition) -> PlatformResult<Position> {
        let terms = self
            .risk
            .position_terms(request.side, request.size, request.entry_price, request.leverage)?;
        let now = self.clock.now();
        let mut book = self.book.lock();
        book.account_mut(&request.user_id, &request.tenant_id, now);
        let open = book.open_positions(&request.user_id);
        self.risk
            .check_open(book.collateral(&request.user_id), &open, &terms)?;

        let position = Position {
            position_id: PositionId::new(),
            user_id: request.user_id,
            tenant_id: request.tenant_id,
            symbol: request.symbol,
            side: request.side,
            size: request.size,
            entry_price: request.entry_price,
            mark_price: request.entry_price,
            leverage: request.leverage,
            initial_margin: terms.initial_margin,
            mm_rate: terms.tier.mm_rate,
            liquidation_price: terms.liquidation_price,
            status: PositionStatus::Open,
            realized_pnl: Decimal::ZERO,
            opened_at: now,
            closed_at: None,
        };
        info!(
            position_id = %position.position_id,
            user_id = %position.user_id,
            symbol = %position.symbol,
            leverage = position.leverage,
            initial_margin = %position.initial_margin,
            "position opened"
        );
        book.positions.insert(position.position_id, position.clone());
        Ok(position)
    }

    async fn positions(&self, user: &UserId, include_closed: bool) -> Vec<Position> {
        self.book
            .lock()
            .positions
            .values()
            .filter(|p| &p.user_id == user && (include_closed || p.is_open()))
            .cloned()
            .collect()
    }

    async fn get_position(&self, position_id: &PositionId) -> PlatformResult<Position> {
        self.book
            .lock()
            .positions
            .get(position_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("position {position_id}")))
    }

    async fn close_position(&self, position_id: &PositionId, exit_price: Price) -> PlatformResult<Position> {
        let now = self.clock.now();
        let mut guard = self.book.lock();
        let MarginBook { accounts, positions } = &mut *guard;
        let position = positions
            .get_mut(position_id)
            .ok_or_else(|| PlatformError::not_found(format!("position {position_id}")))?;
        if !position.is_open() {
            return Err(PlatformError::conflict("POSITION_NOT_OPEN", "position is already closed"));
        }

        let pnl = position.pnl_at(exit_price);
        position.mark_price = exit_price;
        position.realized_pnl = pnl;
        position.status = PositionStatus::Closed;
        position.closed_at = Some(now);
        if let Some(account) = accounts.get_mut(&position.user_id) {
            settle(account, pnl, now);
        }
        info!(position_id = %position_id, %pnl, "position closed");
        Ok(position.clone())
    }

    async fn update_mark_price(&self, symbol: &MarketId, price: Price) -> PlatformResult<Vec<Position>> {
        let now = self.clock.now();
        let mut guard = self.book.lock();
        let MarginBook { accounts, positions } = &mut *guard;

        let mut affected: Vec<UserId> = Vec::new();
        for position in positions.values_mut().filter(|p| p.is_open() && &p.symbol == symbol) {
            position.mark_price = price;
            if !affected.contains(&position.user_id) {
                affected.push(position.user_id);
            }
        }

        let mut liquidated = Vec::new();
        for user in affected {
            let open: Vec<Position> = positions
                .values()
                .filter(|p| p.user_id == user && p.is_open())
                .cloned()
                .collect();
            let collateral = accounts.get(&user).map_or(Decimal::ZERO, |a| a.collateral);
            let health = self.risk.account_health(collateral, &open);
            let Some(ratio) = health.margin_ratio else { continue };
            if !should_liquidate(ratio) {
                continue;
            }

            warn!(user_id = %user, %ratio, symbol = %symbol, "liquidating positions");
            for position in positions
                .values_mut()
                .filter(|p| p.user_id == user && p.is_open() && &p.symbol == symbol)
            {
                let pnl = position.pnl_at(price);
                let account = accounts.get_mut(&user);
                // loss capped at remaining collateral
                let realized = match &account {
                    Some(a) => pnl.max(-a.collateral),
                    None => pnl,
                };
                position.realized_pnl = realized;
                position.status = PositionStatus::Liquidated;
                position.closed_at = Some(now);
                if let Some(account) = account {
                    settle(account, realized, now);
                }
                liquidated.push(position.clone());
            }
        }
        Ok(liquidated)
    }

    async fn health(&self, user: &UserId, tenant: &TenantId) -> AccountHealth {
        let now = self.clock.now();
        let mut book = self.book.lock();
        book.account_mut(user, tenant, now);
        let open = book.open_positions(user);
        self.risk.account_health(book.collateral(user), &open)
    }
}
