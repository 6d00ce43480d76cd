//! Bid (buy-side) order book
//!
//! Price levels are served highest first.
//! Uses BTreeMap so iteration order is deterministic.

use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookSide;

#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, order_id: OrderId, user_id: UserId, price: Price, quantity: Quantity) {
        self.levels
            .entry(price)
            .or_default()
            .insert(order_id, user_id, quantity);
    }

    /// Remove an order; returns true if it was resting at `price`
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        if level.remove(order_id).is_none() {
            return false;
        }
        if level.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl BookSide for BidBook {
    fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next_back().map(|(price, level)| (*price, level))
    }

    fn prune(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&price);
        }
    }

    fn levels(&self) -> Box<dyn Iterator<Item = (Price, &PriceLevel)> + '_> {
        Box::new(self.levels.iter().rev().map(|(price, level)| (*price, level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn qty(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    #[test]
    fn test_best_bid_is_highest() {
        let mut book = BidBook::new();
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(50_000), qty("1.0"));
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(51_000), qty("2.0"));
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(49_000), qty("1.5"));

        let (price, quantity) = book.best_bid().unwrap();
        assert_eq!(price, Price::from_u64(51_000));
        assert_eq!(quantity, qty("2.0"));
    }

    #[test]
    fn test_remove_drops_empty_level() {
        let mut book = BidBook::new();
        let id = OrderId::new();
        book.insert(id, UserId::new(), Price::from_u64(50_000), qty("1.0"));
        assert!(book.remove(&id, Price::from_u64(50_000)));
        assert!(book.is_empty());
        assert!(!book.remove(&id, Price::from_u64(50_000)));
    }

    #[test]
    fn test_depth_snapshot_descending() {
        let mut book = BidBook::new();
        for (price, q) in [(50_000, "1.0"), (51_000, "2.0"), (49_000, "1.5"), (52_000, "0.5")] {
            book.insert(OrderId::new(), UserId::new(), Price::from_u64(price), qty(q));
        }
        let depth = book.depth_snapshot(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].price, Price::from_u64(52_000).as_decimal());
        assert_eq!(depth[1].price, Price::from_u64(51_000).as_decimal());
    }

    #[test]
    fn test_same_price_aggregates() {
        let mut book = BidBook::new();
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(50_000), qty("1.0"));
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(50_000), qty("2.0"));
        assert_eq!(book.level_count(), 1);
        let depth = book.depth_snapshot(5);
        assert_eq!(depth[0].orders, 2);
        assert_eq!(depth[0].quantity, qty("3.0").as_decimal());
    }
}
