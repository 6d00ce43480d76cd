//! Price level implementation with FIFO queue
//!
//! A price level holds every resting order at one price. Orders keep
//! arrival order so the oldest order at a price always trades first.

use std::collections::VecDeque;
use types::ids::{OrderId, UserId};
use types::numeric::Quantity;

/// Resting order reference at a price level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestingEntry {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub remaining: Quantity,
}

/// A price level containing orders at a specific price
#[derive(Debug, Clone)]
pub struct PriceLevel {
    orders: VecDeque<RestingEntry>,
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn insert(&mut self, order_id: OrderId, user_id: UserId, quantity: Quantity) {
        self.orders.push_back(RestingEntry {
            order_id,
            user_id,
            remaining: quantity,
        });
        self.total_quantity = self.total_quantity + quantity;
    }

    /// Remove an order by id, returning its remaining quantity
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self.orders.iter().position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity - entry.remaining;
        Some(entry.remaining)
    }

    pub fn peek_front(&self) -> Option<RestingEntry> {
        self.orders.front().copied()
    }

    /// Reduce the front order by `filled`. A fully filled order leaves the queue.
    pub fn fill_front(&mut self, filled: Quantity) -> Option<RestingEntry> {
        let entry = self.orders.front_mut()?;
        let fill = filled.min(entry.remaining);
        entry.remaining = entry.remaining - fill;
        self.total_quantity = self.total_quantity - fill;

        let updated = *entry;
        if updated.remaining.is_zero() {
            self.orders.pop_front();
        }
        Some(updated)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Entries in time priority
    pub fn iter(&self) -> impl Iterator<Item = &RestingEntry> {
        self.orders.iter()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
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
    fn test_price_level_insert() {
        let mut level = PriceLevel::new();
        level.insert(OrderId::new(), UserId::new(), qty("1.5"));

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), qty("1.5"));
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new();
        let user = UserId::new();
        let first = OrderId::new();
        level.insert(first, user, qty("1.0"));
        level.insert(OrderId::new(), user, qty("2.0"));
        level.insert(OrderId::new(), user, qty("3.0"));

        let front = level.peek_front().unwrap();
        assert_eq!(front.order_id, first);
        assert_eq!(front.remaining, qty("1.0"));
    }

    #[test]
    fn test_price_level_remove() {
        let mut level = PriceLevel::new();
        let user = UserId::new();
        let order1 = OrderId::new();
        level.insert(order1, user, qty("1.0"));
        level.insert(OrderId::new(), user, qty("2.0"));

        assert_eq!(level.remove(&order1), Some(qty("1.0")));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), qty("2.0"));
        assert_eq!(level.remove(&order1), None);
    }

    #[test]
    fn test_fill_front_partial_then_complete() {
        let mut level = PriceLevel::new();
        level.insert(OrderId::new(), UserId::new(), qty("5.0"));

        let after = level.fill_front(qty("2.0")).unwrap();
        assert_eq!(after.remaining, qty("3.0"));
        assert_eq!(level.total_quantity(), qty("3.0"));

        let after = level.fill_front(qty("3.0")).unwrap();
        assert!(after.remaining.is_zero());
        assert!(level.is_empty());
        assert!(level.total_quantity().is_zero());
    }

    #[test]
    fn test_total_quantity_is_sum_of_entries() {
        let mut level = PriceLevel::new();
        let user = UserId::new();
        level.insert(OrderId::new(), user, qty("1.5"));
        level.insert(OrderId::new(), user, qty("2.5"));
        level.insert(OrderId::new(), user, qty("3.0"));

        let sum = level
            .iter()
            .fold(Quantity::zero(), |acc, e| acc + e.remaining);
        assert_eq!(level.total_quantity(), sum);
        assert_eq!(sum, qty("7.0"));
    }
}
