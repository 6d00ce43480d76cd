//! Trade execution types
//!
//! A trade is an atomic exchange between a resting maker order and an
//! incoming taker order, always at the maker's price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{MarketId, OrderId, TradeId, UserId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Engine-wide monotonic sequence
    pub sequence: u64,
    pub symbol: MarketId,

    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,

    /// Taker side
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,

    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Quote-currency value of the trade
    pub fn notional(&self) -> Decimal {
        self.quantity.notional(self.price)
    }

    pub fn involves(&self, user: &UserId) -> bool {
        &self.maker_user_id == user || &self.taker_user_id == user
    }
}
