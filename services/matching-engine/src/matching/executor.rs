//! Trade execution logic
//!
//! Turns a crossing between a resting maker and an incoming taker into a
//! sequenced trade.

use chrono::{DateTime, Utc};
use types::ids::{MarketId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

use crate::book::RestingEntry;

/// Match executor for handling trade generation
#[derive(Debug)]
pub struct MatchExecutor {
    sequence_counter: u64,
}

impl MatchExecutor {
    pub fn new(starting_sequence: u64) -> Self {
        Self {
            sequence_counter: starting_sequence,
        }
    }

    /// Next sequence number (monotonically increasing)
    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence_counter;
        self.sequence_counter += 1;
        seq
    }

    /// Sequence the next trade will carry
    pub fn peek_sequence(&self) -> u64 {
        self.sequence_counter
    }

    /// Execute a trade at the maker's price
    pub fn execute_trade(
        &mut self,
        symbol: &MarketId,
        maker: &RestingEntry,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        timestamp: DateTime<Utc>,
    ) -> Result<Trade, MatchError> {
        if maker.user_id == taker.user_id {
            return Err(MatchError::SelfTrade);
        }
        if quantity.is_zero() {
            return Err(MatchError::InvalidQuantity);
        }

        Ok(Trade {
            trade_id: TradeId::new(),
            sequence: self.next_sequence(),
            symbol: symbol.clone(),
            maker_order_id: maker.order_id,
            taker_order_id: taker.order_id,
            maker_user_id: maker.user_id,
            taker_user_id: taker.user_id,
            side: taker.side,
            price,
            quantity,
            executed_at: timestamp,
        })
    }
}

/// Match execution errors
#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    /// Maker and taker belong to the same user
    SelfTrade,
    InvalidQuantity,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use types::ids::{OrderId, TenantId, UserId};
    use types::order::{NewOrder, OrderType, Side, TimeInForce};

    fn taker(user: UserId) -> Order {
        Order::new(
            NewOrder {
                user_id: user,
                tenant_id: TenantId::try_new("acme").unwrap(),
                symbol: MarketId::try_new("BTC/USDT").unwrap(),
                side: Side::BUY,
                order_type: OrderType::Limit,
                price: Some(Price::from_u64(50_000)),
                quantity: Quantity::from_str("1").unwrap(),
                time_in_force: TimeInForce::GTC,
            },
            Utc::now(),
        )
    }

    fn maker(user: UserId) -> RestingEntry {
        RestingEntry {
            order_id: OrderId::new(),
            user_id: user,
            remaining: Quantity::from_str("1").unwrap(),
        }
    }

    #[test]
    fn test_execute_trade() {
        let mut executor = MatchExecutor::new(1000);
        let taker = taker(UserId::new());
        let trade = executor
            .execute_trade(
                &taker.symbol,
                &maker(UserId::new()),
                &taker,
                Price::from_u64(49_500),
                Quantity::from_str("0.5").unwrap(),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(trade.sequence, 1000);
        assert_eq!(trade.price, Price::from_u64(49_500));
        assert_eq!(trade.side, Side::BUY);
        assert_eq!(trade.taker_order_id, taker.order_id);
    }

    #[test]
    fn test_self_trade_prevention() {
        let mut executor = MatchExecutor::new(1000);
        let user = UserId::new();
        let taker = taker(user);
        let result = executor.execute_trade(
            &taker.symbol,
            &maker(user),
            &taker,
            Price::from_u64(50_000),
            Quantity::from_str("0.5").unwrap(),
            Utc::now(),
        );

        assert_eq!(result, Err(MatchError::SelfTrade));
        assert_eq!(executor.peek_sequence(), 1000);
    }

    #[test]
    fn test_sequence_monotonic() {
        let mut executor = MatchExecutor::new(7);
        let taker = taker(UserId::new());
        let qty = Quantity::from_str("0.1").unwrap();
        let price = Price::from_u64(50_000);
        let t1 = executor
            .execute_trade(&taker.symbol, &maker(UserId::new()), &taker, price, qty, Utc::now())
            .unwrap();
        let t2 = executor
            .execute_trade(&taker.symbol, &maker(UserId::new()), &taker, price, qty, Utc::now())
            .unwrap();
        assert_eq!(t1.sequence, 7);
        assert_eq!(t2.sequence, 8);
    }
}
