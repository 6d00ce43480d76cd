//! Listed spot market configuration

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::MarketId;

/// Trading rules for one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub symbol: MarketId,
    /// Minimum price increment
    pub tick_size: Decimal,
    /// Minimum quantity increment
    pub lot_size: Decimal,
    /// Minimum order value in quote currency
    pub min_notional: Decimal,
}

/// One aggregated price level of a depth snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
    pub symbol: MarketId,
    /// Best (highest) bid first
    pub bids: Vec<DepthLevel>,
    /// Best (lowest) ask first
    pub asks: Vec<DepthLevel>,
    pub sequence: u64,
}

impl OrderBookSnapshot {
    pub fn spread(&self) -> Option<Decimal> {
        match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => Some(ask.price - bid.price),
            _ => None,
        }
    }
}
