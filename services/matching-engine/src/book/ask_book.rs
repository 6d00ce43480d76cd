//! Ask (sell-side) order book
//!
//! Price levels are served lowest first.
//! Uses BTreeMap so iteration order is deterministic.

use std::collections::BTreeMap;
use types::ids::{OrderId, UserId};
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;
use super::BookSide;

#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
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

    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

impl BookSide for AskBook {
    fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)> {
        self.levels.iter_mut().next().map(|(price, level)| (*price, level))
    }

    fn prune(&mut self, price: Price) {
        if self.levels.get(&price).is_some_and(PriceLevel::is_empty) {
            self.levels.remove(&price);
        }
    }

    fn levels(&self) -> Box<dyn Iterator<Item = (Price, &PriceLevel)> + '_> {
        Box::new(self.levels.iter().map(|(price, level)| (*price, level)))
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
    fn test_best_ask_is_lowest() {
        let mut book = AskBook::new();
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(50_000), qty("1.0"));
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(49_000), qty("2.0"));
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(51_000), qty("1.5"));

        let (price, quantity) = book.best_ask().unwrap();
        assert_eq!(price, Price::from_u64(49_000));
        assert_eq!(quantity, qty("2.0"));
    }

    #[test]
    fn test_prune_only_empty_levels() {
        let mut book = AskBook::new();
        book.insert(OrderId::new(), UserId::new(), Price::from_u64(100), qty("1.0"));
        book.prune(Price::from_u64(100));
        assert_eq!(book.level_count(), 1);

        if let Some((_, level)) = book.best_level_mut() {
            level.fill_front(qty("1.0"));
        }
        book.prune(Price::from_u64(100));
        assert!(book.is_empty());
    }

    #[test]
    fn test_depth_snapshot_ascending() {
        let mut book = AskBook::new();
        for price in [103, 101, 102] {
            book.insert(OrderId::new(), UserId::new(), Price::from_u64(price), qty("1"));
        }
        let prices: Vec<_> = book.depth_snapshot(10).into_iter().map(|l| l.price).collect();
        assert_eq!(
            prices,
            vec![
                Price::from_u64(101).as_decimal(),
                Price::from_u64(102).as_decimal(),
                Price::from_u64(103).as_decimal()
            ]
        );
    }
}
