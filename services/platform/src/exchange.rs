//! Spot exchange service over the matching engine

use std::sync::Arc;

use async_trait::async_trait;
use matching_engine::{ExecutionReport, MatchingEngine, OrderFilter};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use tracing::{info, warn};
use types::ids::{MarketId, OrderId, UserId};
use types::market::{Market, OrderBookSnapshot};
use types::order::{CancelReason, NewOrder, Order};
use types::trade::Trade;

use crate::clock::Clock;
use crate::error::{PlatformError, PlatformResult};

#[async_trait]
pub trait ExchangeService: Send + Sync {
    async fn list_markets(&self) -> Vec<Market>;

    async fn create_market(&self, market: Market) -> PlatformResult<Market>;

    async fn order_book(&self, symbol: &MarketId, depth: usize) -> PlatformResult<OrderBookSnapshot>;

    async fn place_order(&self, order: NewOrder) -> PlatformResult<ExecutionReport>;

    async fn get_order(&self, order_id: &OrderId) -> PlatformResult<Order>;

    async fn list_orders(&self, filter: OrderFilter) -> Vec<Order>;

    async fn cancel_order(&self, order_id: &OrderId, reason: CancelReason) -> PlatformResult<Order>;

    /// Most recent first
    async fn trades(&self, user: &UserId, symbol: Option<&MarketId>, limit: usize) -> Vec<Trade>;
}

/// Single-writer exchange: one engine behind one lock
pub struct InMemoryExchange {
    engine: Mutex<MatchingEngine>,
    clock: Arc<dyn Clock>,
}

impl InMemoryExchange {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            engine: Mutex::new(MatchingEngine::new(1)),
            clock,
        }
    }

    /// Exchange with the platform's standard USDT markets listed
    pub fn with_default_markets(clock: Arc<dyn Clock>) -> Self {
        let exchange = Self::new(clock);
        {
            let mut engine = exchange.engine.lock();
            for (symbol, tick_size, lot_size, min_notional) in [
                ("BTC/USDT", dec!(0.01), dec!(0.00001), dec!(10)),
                ("ETH/USDT", dec!(0.01), dec!(0.0001), dec!(10)),
                ("THAL/USDT", dec!(0.0001), dec!(1), dec!(1)),
            ] {
                let Ok(symbol) = MarketId::try_new(symbol) else { continue };
                let market = Market {
                    symbol,
                    tick_size,
                    lot_size,
                    min_notional,
                };
                if let Err(err) = engine.list_market(market) {
                    warn!(error = %err, "default market not listed");
                }
            }
        }
        exchange
    }
}

#[async_trait]
impl ExchangeService for InMemoryExchange {
    async fn list_markets(&self) -> Vec<Market> {
        self.engine.lock().markets()
    }

    async fn create_market(&self, market: Market) -> PlatformResult<Market> {
        if market.tick_size <= dec!(0) || market.lot_size <= dec!(0) || market.min_notional < dec!(0) {
            return Err(PlatformError::validation(
                "tick_size and lot_size must be positive, min_notional non-negative",
            ));
        }
        let listed = self.engine.lock().list_market(market)?;
        info!(symbol = %listed.symbol, "market listed");
        Ok(listed)
    }

    async fn order_book(&self, symbol: &MarketId, depth: usize) -> PlatformResult<OrderBookSnapshot> {
        Ok(self.engine.lock().order_book(symbol, depth)?)
    }

    async fn place_order(&self, order: NewOrder) -> PlatformResult<ExecutionReport> {
        let now = self.clock.now();
        let report = self.engine.lock().submit_order(order, now)?;
        info!(
            order_id = %report.order.order_id,
            user_id = %report.order.user_id,
            symbol = %report.order.symbol,
            status = report.order.status.label(),
            trades = report.trades.len(),
            "order processed"
        );
        Ok(report)
    }

    async fn get_order(&self, order_id: &OrderId) -> PlatformResult<Order> {
        self.engine
            .lock()
            .order(order_id)
            .cloned()
            .ok_or_else(|| PlatformError::not_found(format!("order {order_id}")))
    }

    async fn list_orders(&self, filter: OrderFilter) -> Vec<Order> {
        self.engine.lock().orders(&filter)
    }

    async fn cancel_order(&self, order_id: &OrderId, reason: CancelReason) -> PlatformResult<Order> {
        let now = self.clock.now();
        let order = self.engine.lock().cancel_order(order_id, reason, now)?;
        info!(order_id = %order_id, ?reason, "order canceled");
        Ok(order)
    }

    async fn trades(&self, user: &UserId, symbol: Option<&MarketId>, limit: usize) -> Vec<Trade> {
        self.engine.lock().trades(symbol, Some(user), limit)
    }
}
