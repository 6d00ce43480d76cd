//! Matching engine core
//!
//! Owns the listed markets, their books, every order it has seen and the
//! trade tape. Callers serialize access (one writer), which keeps matching
//! deterministic.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use types::errors::OrderError;
use types::ids::{MarketId, OrderId, TenantId, UserId};
use types::market::{Market, OrderBookSnapshot};
use types::numeric::Price;
use types::order::{CancelReason, NewOrder, Order, OrderType, RejectReason, Side, TimeInForce};
use types::trade::Trade;

use crate::book::{AskBook, BidBook, BookSide};
use crate::matching::{crosses, fillable_quantity, MatchError, MatchExecutor};

/// Main matching engine
#[derive(Debug)]
pub struct MatchingEngine {
    books: BTreeMap<MarketId, OrderBook>,
    orders: BTreeMap<OrderId, Order>,
    trades: Vec<Trade>,
    executor: MatchExecutor,
}

/// Order book for a single symbol
#[derive(Debug)]
struct OrderBook {
    market: Market,
    bids: BidBook,
    asks: AskBook,
}

/// Outcome of a submission: the order's final state and the trades it caused
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Order listing filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub user_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
    pub symbol: Option<MarketId>,
    pub open_only: bool,
}

impl OrderFilter {
    fn matches(&self, order: &Order) -> bool {
        self.user_id.map_or(true, |u| order.user_id == u)
            && self.tenant_id.as_ref().map_or(true, |t| &order.tenant_id == t)
            && self.symbol.as_ref().map_or(true, |s| &order.symbol == s)
            && (!self.open_only || order.is_open())
    }
}

impl MatchingEngine {
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            books: BTreeMap::new(),
            orders: BTreeMap::new(),
            trades: Vec::new(),
            executor: MatchExecutor::new(starting_sequence),
        }
    }

    /// List a new market
    pub fn list_market(&mut self, market: Market) -> Result<Market, OrderError> {
        if market.tick_size <= Decimal::ZERO {
            return Err(OrderError::InvalidPrice("tick_size must be positive".into()));
        }
        if market.lot_size <= Decimal::ZERO {
            return Err(OrderError::InvalidQuantity("lot_size must be positive".into()));
        }
        if market.min_notional < Decimal::ZERO {
            return Err(OrderError::InvalidQuantity("min_notional must not be negative".into()));
        }
        if self.books.contains_key(&market.symbol) {
            return Err(OrderError::MarketExists {
                symbol: market.symbol.to_string(),
            });
        }
        self.books.insert(
            market.symbol.clone(),
            OrderBook {
                market: market.clone(),
                bids: BidBook::new(),
                asks: AskBook::new(),
            },
        );
        Ok(market)
    }

    pub fn markets(&self) -> Vec<Market> {
        self.books.values().map(|b| b.market.clone()).collect()
    }

    pub fn market(&self, symbol: &MarketId) -> Option<&Market> {
        self.books.get(symbol).map(|b| &b.market)
    }

    /// Submit an order to the matching engine
    ///
    /// Validation failures return an error and leave no trace. Orders that
    /// pass validation are always recorded, even when rejected (FOK, no
    /// liquidity) or canceled (IOC remainder, self-trade).
    pub fn submit_order(
        &mut self,
        mut params: NewOrder,
        timestamp: DateTime<Utc>,
    ) -> Result<ExecutionReport, OrderError> {
        let Self {
            books,
            orders,
            trades: tape,
            executor,
        } = self;

        let book = books.get_mut(&params.symbol).ok_or_else(|| OrderError::UnknownMarket {
            symbol: params.symbol.to_string(),
        })?;

        let reference = validate(&book.market, book.opposite_best(params.side), &mut params)?;

        let mut order = Order::new(params, timestamp);
        if reference.is_none() {
            order.reject(RejectReason::NoLiquidity, timestamp);
            orders.insert(order.order_id, order.clone());
            return Ok(ExecutionReport {
                order,
                trades: Vec::new(),
            });
        }

        if order.time_in_force == TimeInForce::FOK {
            let fillable = match order.side {
                Side::BUY => fillable_quantity(&book.asks, Side::BUY, order.price, &order.user_id, order.quantity),
                Side::SELL => fillable_quantity(&book.bids, Side::SELL, order.price, &order.user_id, order.quantity),
            };
            if fillable < order.quantity {
                order.reject(RejectReason::FillOrKill, timestamp);
                orders.insert(order.order_id, order.clone());
                return Ok(ExecutionReport {
                    order,
                    trades: Vec::new(),
                });
            }
        }

        let symbol = book.market.symbol.clone();
        let outcome = match order.side {
            Side::BUY => match_against(&mut book.asks, &symbol, executor, orders, &mut order, timestamp),
            Side::SELL => match_against(&mut book.bids, &symbol, executor, orders, &mut order, timestamp),
        };

        if !order.is_filled() {
            if outcome.self_trade {
                order.cancel(CancelReason::SelfTrade, timestamp);
            } else if order.order_type == OrderType::Market || order.time_in_force != TimeInForce::GTC {
                order.cancel(CancelReason::Unfilled, timestamp);
            } else if let Some(price) = order.price {
                match order.side {
                    Side::BUY => book.bids.insert(order.order_id, order.user_id, price, order.remaining_quantity),
                    Side::SELL => book.asks.insert(order.order_id, order.user_id, price, order.remaining_quantity),
                }
            }
        }

        tape.extend(outcome.trades.iter().cloned());
        orders.insert(order.order_id, order.clone());

        Ok(ExecutionReport {
            order,
            trades: outcome.trades,
        })
    }

    /// Cancel a resting order
    pub fn cancel_order(
        &mut self,
        order_id: &OrderId,
        reason: CancelReason,
        timestamp: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        let order = self.orders.get_mut(order_id).ok_or_else(|| OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;
        if order.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                status: order.status.label().to_string(),
            });
        }

        if let (Some(book), Some(price)) = (self.books.get_mut(&order.symbol), order.price) {
            match order.side {
                Side::BUY => book.bids.remove(order_id, price),
                Side::SELL => book.asks.remove(order_id, price),
            };
        }
        order.cancel(reason, timestamp);
        Ok(order.clone())
    }

    pub fn order(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Orders matching `filter`, oldest first
    pub fn orders(&self, filter: &OrderFilter) -> Vec<Order> {
        self.orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect()
    }

    /// Most recent trades first
    pub fn trades(&self, symbol: Option<&MarketId>, user: Option<&UserId>, limit: usize) -> Vec<Trade> {
        self.trades
            .iter()
            .rev()
            .filter(|t| symbol.map_or(true, |s| &t.symbol == s))
            .filter(|t| user.map_or(true, |u| t.involves(u)))
            .take(limit)
            .cloned()
            .collect()
    }

    /// Aggregated depth for `symbol`
    pub fn order_book(&self, symbol: &MarketId, depth: usize) -> Result<OrderBookSnapshot, OrderError> {
        let book = self.books.get(symbol).ok_or_else(|| OrderError::UnknownMarket {
            symbol: symbol.to_string(),
        })?;
        Ok(OrderBookSnapshot {
            symbol: symbol.clone(),
            bids: book.bids.depth_snapshot(depth),
            asks: book.asks.depth_snapshot(depth),
            sequence: self.executor.peek_sequence(),
        })
    }

    /// Best bid and best ask prices
    pub fn top_of_book(&self, symbol: &MarketId) -> Option<(Option<Price>, Option<Price>)> {
        self.books
            .get(symbol)
            .map(|b| (b.bids.best_bid().map(|l| l.0), b.asks.best_ask().map(|l| l.0)))
    }
}

impl OrderBook {
    /// Best price an incoming order on `side` would trade against
    fn opposite_best(&self, side: Side) -> Option<Price> {
        match side {
            Side::BUY => self.asks.best_ask().map(|l| l.0),
            Side::SELL => self.bids.best_bid().map(|l| l.0),
        }
    }
}

/// Checks market rules and normalizes the order.
///
/// Returns the price used for the notional check: the limit price, or for
/// market orders the best opposite price (None when that side is empty).
fn validate(
    market: &Market,
    opposite_best: Option<Price>,
    params: &mut NewOrder,
) -> Result<Option<Price>, OrderError> {
    if params.quantity.is_zero() {
        return Err(OrderError::InvalidQuantity("quantity must be positive".into()));
    }
    if !params.quantity.is_multiple_of(market.lot_size) {
        return Err(OrderError::InvalidQuantity(format!(
            "quantity must be a multiple of lot size {}",
            market.lot_size
        )));
    }

    let reference = match params.order_type {
        OrderType::Limit => {
            let price = params
                .price
                .ok_or_else(|| OrderError::InvalidPrice("limit orders require a price".into()))?;
            if !price.is_multiple_of(market.tick_size) {
                return Err(OrderError::InvalidPrice(format!(
                    "price must be a multiple of tick size {}",
                    market.tick_size
                )));
            }
            Some(price)
        }
        OrderType::Market => {
            if params.price.is_some() {
                return Err(OrderError::InvalidPrice("market orders must not carry a price".into()));
            }
            if params.time_in_force == TimeInForce::GTC {
                params.time_in_force = TimeInForce::IOC;
            }
            opposite_best
        }
    };

    if let Some(price) = reference {
        let notional = params.quantity.notional(price);
        if notional < market.min_notional {
            return Err(OrderError::BelowMinNotional {
                notional,
                minimum: market.min_notional,
            });
        }
    }
    Ok(reference)
}

struct MatchOutcome {
    trades: Vec<Trade>,
    self_trade: bool,
}

/// Match `taker` against the opposite side until it fills, stops crossing
/// or meets one of its owner's resting orders.
fn match_against<B: BookSide>(
    book: &mut B,
    symbol: &MarketId,
    executor: &mut MatchExecutor,
    orders: &mut BTreeMap<OrderId, Order>,
    taker: &mut Order,
    timestamp: DateTime<Utc>,
) -> MatchOutcome {
    let mut trades = Vec::new();
    let mut self_trade = false;

    while !taker.is_filled() {
        let Some((price, level)) = book.best_level_mut() else {
            break;
        };
        if !crosses(taker.side, taker.price, price) {
            break;
        }
        let Some(maker) = level.peek_front() else {
            book.prune(price);
            continue;
        };

        let quantity = taker.remaining_quantity.min(maker.remaining);
        match executor.execute_trade(symbol, &maker, taker, price, quantity, timestamp) {
            Ok(trade) => {
                level.fill_front(quantity);
                book.prune(price);
                taker.add_fill(quantity, timestamp);
                if let Some(resting) = orders.get_mut(&maker.order_id) {
                    resting.add_fill(quantity, timestamp);
                }
                trades.push(trade);
            }
            Err(MatchError::SelfTrade) => {
                self_trade = true;
                break;
            }
            Err(MatchError::InvalidQuantity) => break,
        }
    }

    MatchOutcome { trades, self_trade }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;
    use types::numeric::Quantity;
    use types::order::OrderStatus;

    fn btc() -> MarketId {
        MarketId::try_new("BTC/USDT").unwrap()
    }

    fn engine() -> MatchingEngine {
        let mut engine = MatchingEngine::new(1);
        engine
            .list_market(Market {
                symbol: btc(),
                tick_size: dec!(0.5),
                lot_size: dec!(0.001),
                min_notional: dec!(10),
            })
            .unwrap();
        engine
    }

    fn limit(user: UserId, side: Side, price: u64, qty: &str, tif: TimeInForce) -> NewOrder {
        NewOrder {
            user_id: user,
            tenant_id: TenantId::try_new("acme").unwrap(),
            symbol: btc(),
            side,
            order_type: OrderType::Limit,
            price: Some(Price::from_u64(price)),
            quantity: Quantity::from_str(qty).unwrap(),
            time_in_force: tif,
        }
    }

    fn market(user: UserId, side: Side, qty: &str) -> NewOrder {
        NewOrder {
            order_type: OrderType::Market,
            price: None,
            ..limit(user, side, 1, qty, TimeInForce::GTC)
        }
    }

    fn q(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    #[test]
    fn test_engine_accepts_largest_price_and_quantity() {
        let mut engine = engine();
        let max = types::numeric::MAX_MAGNITUDE;
        let order = NewOrder {
            price: Price::try_new(max),
            quantity: Quantity::try_new(max).unwrap(),
            ..limit(UserId::new(), Side::BUY, 1, "1", TimeInForce::GTC)
        };
        let report = engine.submit_order(order, Utc::now()).unwrap();
        assert_eq!(report.order.status, OrderStatus::Pending);

        let crossing = NewOrder {
            price: Price::try_new(max),
            quantity: Quantity::try_new(max).unwrap(),
            ..limit(UserId::new(), Side::SELL, 1, "1", TimeInForce::GTC)
        };
        let report = engine.submit_order(crossing, Utc::now()).unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].notional(), max * max);
    }

    #[test]
    fn test_engine_resting_order() {
        let mut engine = engine();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Pending);
        assert!(report.trades.is_empty());
        let depth = engine.order_book(&btc(), 10).unwrap();
        assert_eq!(depth.bids.len(), 1);
    }

    #[test]
    fn test_engine_full_match_at_maker_price() {
        let mut engine = engine();
        let maker = engine
            .submit_order(limit(UserId::new(), Side::SELL, 49_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Filled);
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].price, Price::from_u64(49_000));
        assert_eq!(
            engine.order(&maker.order.order_id).unwrap().status,
            OrderStatus::Filled
        );
        assert!(engine.order_book(&btc(), 10).unwrap().asks.is_empty());
    }

    #[test]
    fn test_engine_partial_match_rests_remainder() {
        let mut engine = engine();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "0.5", TimeInForce::GTC), Utc::now())
            .unwrap();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Partial);
        assert_eq!(report.order.remaining_quantity, q("0.5"));
        let depth = engine.order_book(&btc(), 10).unwrap();
        assert_eq!(depth.bids[0].quantity, dec!(0.5));
    }

    #[test]
    fn test_price_time_priority() {
        let mut engine = engine();
        let first = engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        let second = engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        let better = engine
            .submit_order(limit(UserId::new(), Side::SELL, 49_500, "1", TimeInForce::GTC), Utc::now())
            .unwrap();

        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "2", TimeInForce::GTC), Utc::now())
            .unwrap();
        let makers: Vec<_> = report.trades.iter().map(|t| t.maker_order_id).collect();
        assert_eq!(makers, vec![better.order.order_id, first.order.order_id]);
        assert_eq!(engine.order(&second.order.order_id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_ioc_remainder_canceled() {
        let mut engine = engine();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "0.4", TimeInForce::GTC), Utc::now())
            .unwrap();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::IOC), Utc::now())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Canceled(CancelReason::Unfilled));
        assert_eq!(report.order.filled_quantity, q("0.4"));
        assert!(engine.order_book(&btc(), 10).unwrap().bids.is_empty());
    }

    #[test]
    fn test_fok_is_atomic() {
        let mut engine = engine();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "0.4", TimeInForce::GTC), Utc::now())
            .unwrap();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::FOK), Utc::now())
            .unwrap();

        assert_eq!(report.order.status, OrderStatus::Rejected(RejectReason::FillOrKill));
        assert!(report.trades.is_empty());
        let depth = engine.order_book(&btc(), 10).unwrap();
        assert_eq!(depth.asks[0].quantity, dec!(0.4));
    }

    #[test]
    fn test_self_trade_cancels_taker() {
        let mut engine = engine();
        let me = UserId::new();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 49_000, "0.5", TimeInForce::GTC), Utc::now())
            .unwrap();
        let mine = engine
            .submit_order(limit(me, Side::SELL, 49_500, "1", TimeInForce::GTC), Utc::now())
            .unwrap();

        let report = engine
            .submit_order(limit(me, Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.order.status, OrderStatus::Canceled(CancelReason::SelfTrade));
        assert_eq!(engine.order(&mine.order.order_id).unwrap().status, OrderStatus::Pending);
    }

    #[test]
    fn test_market_order_sweeps_and_cancels_rest() {
        let mut engine = engine();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 50_000, "0.5", TimeInForce::GTC), Utc::now())
            .unwrap();
        engine
            .submit_order(limit(UserId::new(), Side::SELL, 51_000, "0.5", TimeInForce::GTC), Utc::now())
            .unwrap();

        let report = engine.submit_order(market(UserId::new(), Side::BUY, "2"), Utc::now()).unwrap();
        assert_eq!(report.trades.len(), 2);
        assert_eq!(report.order.time_in_force, TimeInForce::IOC);
        assert_eq!(report.order.status, OrderStatus::Canceled(CancelReason::Unfilled));
    }

    #[test]
    fn test_market_order_without_liquidity_rejected() {
        let mut engine = engine();
        let report = engine.submit_order(market(UserId::new(), Side::SELL, "1"), Utc::now()).unwrap();
        assert_eq!(report.order.status, OrderStatus::Rejected(RejectReason::NoLiquidity));
    }

    #[test]
    fn test_validation_rules() {
        let mut engine = engine();
        let user = UserId::new();

        let off_tick = limit(user, Side::BUY, 50_000, "1", TimeInForce::GTC);
        let off_tick = NewOrder {
            price: Some(Price::from_str("50000.3").unwrap()),
            ..off_tick
        };
        assert!(matches!(engine.submit_order(off_tick, Utc::now()), Err(OrderError::InvalidPrice(_))));

        let off_lot = limit(user, Side::BUY, 50_000, "0.0001", TimeInForce::GTC);
        assert!(matches!(engine.submit_order(off_lot, Utc::now()), Err(OrderError::InvalidQuantity(_))));

        let tiny = limit(user, Side::BUY, 1, "1", TimeInForce::GTC);
        assert!(matches!(
            engine.submit_order(tiny, Utc::now()),
            Err(OrderError::BelowMinNotional { .. })
        ));

        let no_price = NewOrder {
            price: None,
            ..limit(user, Side::BUY, 50_000, "1", TimeInForce::GTC)
        };
        assert!(matches!(engine.submit_order(no_price, Utc::now()), Err(OrderError::InvalidPrice(_))));

        let unknown = NewOrder {
            symbol: MarketId::try_new("ETH/USDT").unwrap(),
            ..limit(user, Side::BUY, 50_000, "1", TimeInForce::GTC)
        };
        assert!(matches!(
            engine.submit_order(unknown, Utc::now()),
            Err(OrderError::UnknownMarket { .. })
        ));
    }

    #[test]
    fn test_cancel_removes_from_book() {
        let mut engine = engine();
        let report = engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        let canceled = engine
            .cancel_order(&report.order.order_id, CancelReason::UserRequested, Utc::now())
            .unwrap();
        assert_eq!(canceled.status, OrderStatus::Canceled(CancelReason::UserRequested));
        assert!(engine.order_book(&btc(), 10).unwrap().bids.is_empty());
        assert!(matches!(
            engine.cancel_order(&report.order.order_id, CancelReason::UserRequested, Utc::now()),
            Err(OrderError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn test_duplicate_market_listing() {
        let mut engine = engine();
        let again = engine.list_market(Market {
            symbol: btc(),
            tick_size: dec!(1),
            lot_size: dec!(1),
            min_notional: dec!(0),
        });
        assert!(matches!(again, Err(OrderError::MarketExists { .. })));
    }

    #[test]
    fn test_trade_listing_filters_by_user() {
        let mut engine = engine();
        let maker = UserId::new();
        engine
            .submit_order(limit(maker, Side::SELL, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        engine
            .submit_order(limit(UserId::new(), Side::BUY, 50_000, "1", TimeInForce::GTC), Utc::now())
            .unwrap();
        assert_eq!(engine.trades(Some(&btc()), Some(&maker), 10).len(), 1);
        assert!(engine.trades(None, Some(&UserId::new()), 10).is_empty());
    }

    proptest! {
        #[test]
        fn prop_quantity_is_conserved(
            ops in prop::collection::vec((any::<bool>(), 95u64..105, 1u32..20, 0usize..3, 0u8..3), 1..60)
        ) {
            let mut engine = engine();
            let users = [UserId::new(), UserId::new(), UserId::new()];
            for (buy, price, lots, user, tif) in ops {
                let tif = match tif {
                    0 => TimeInForce::GTC,
                    1 => TimeInForce::IOC,
                    _ => TimeInForce::FOK,
                };
                let side = if buy { Side::BUY } else { Side::SELL };
                let qty = Quantity::try_new(Decimal::from(lots) / dec!(10)).unwrap();
                let params = NewOrder {
                    quantity: qty,
                    ..limit(users[user], side, price * 1000, "1", tif)
                };
                let _ = engine.submit_order(params, Utc::now());

                if let Some((Some(bid), Some(ask))) = engine.top_of_book(&btc()) {
                    prop_assert!(bid < ask, "book crossed: {} >= {}", bid, ask);
                }
            }

            let orders = engine.orders(&OrderFilter::default());
            let filled: Decimal = orders.iter().map(|o| o.filled_quantity.as_decimal()).sum();
            let traded: Decimal = engine.trades(None, None, usize::MAX).iter().map(|t| t.quantity.as_decimal()).sum();
            prop_assert_eq!(filled, traded * dec!(2));
            for order in &orders {
                prop_assert!(order.check_invariant());
            }
        }
    }
}
