//! Order lifecycle types
//!
//! An order moves PENDING -> PARTIAL -> FILLED, or ends early in
//! CANCELED / REJECTED. Terminal states never transition again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{MarketId, OrderId, TenantId, UserId};
use crate::numeric::{Price, Quantity};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Limit,
    /// Takes liquidity at any price, remainder canceled
    Market,
}

/// Time-in-force policy for orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good-Till-Cancel: remains until filled or explicitly canceled
    #[default]
    GTC,
    /// Immediate-Or-Cancel: match immediately, cancel remainder
    IOC,
    /// Fill-Or-Kill: full match or reject entirely
    FOK,
}

/// Order status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason")]
pub enum OrderStatus {
    #[serde(rename = "PENDING")]
    Pending,

    #[serde(rename = "PARTIAL")]
    Partial,

    #[serde(rename = "FILLED")]
    Filled,

    #[serde(rename = "CANCELED")]
    Canceled(CancelReason),

    #[serde(rename = "REJECTED")]
    Rejected(RejectReason),
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Canceled(_) | OrderStatus::Rejected(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Partial => "PARTIAL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled(_) => "CANCELED",
            OrderStatus::Rejected(_) => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancelReason {
    UserRequested,
    SelfTrade,
    /// IOC / MARKET remainder
    Unfilled,
    AdminCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// FOK order could not be completely filled
    FillOrKill,
    NoLiquidity,
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    /// None for MARKET orders
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub time_in_force: TimeInForce,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for a new order
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub time_in_force: TimeInForce,
}

impl Order {
    /// Create a new pending order
    pub fn new(params: NewOrder, timestamp: DateTime<Utc>) -> Self {
        Self {
            order_id: OrderId::new(),
            user_id: params.user_id,
            tenant_id: params.tenant_id,
            symbol: params.symbol,
            side: params.side,
            order_type: params.order_type,
            price: params.price,
            quantity: params.quantity,
            filled_quantity: Quantity::zero(),
            remaining_quantity: params.quantity,
            status: OrderStatus::Pending,
            time_in_force: params.time_in_force,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Check quantity invariant: filled + remaining = total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity.as_decimal() + self.remaining_quantity.as_decimal()
            == self.quantity.as_decimal()
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Apply a fill, clamped to the remaining quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: DateTime<Utc>) {
        let fill = fill_quantity.min(self.remaining_quantity);
        self.filled_quantity = self.filled_quantity + fill;
        self.remaining_quantity = self.quantity - self.filled_quantity;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::Partial;
        }
        self.updated_at = timestamp;

        debug_assert!(self.check_invariant(), "Invariant violated after fill");
    }

    /// Cancel the order. Returns false if it was already terminal.
    pub fn cancel(&mut self, reason: CancelReason, timestamp: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = OrderStatus::Canceled(reason);
        self.updated_at = timestamp;
        true
    }

    pub fn reject(&mut self, reason: RejectReason, timestamp: DateTime<Utc>) {
        self.status = OrderStatus::Rejected(reason);
        self.updated_at = timestamp;
    }

    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn sample(quantity: &str) -> Order {
        Order::new(
            NewOrder {
                user_id: UserId::new(),
                tenant_id: TenantId::try_new("acme").unwrap(),
                symbol: MarketId::try_new("BTC/USDT").unwrap(),
                side: Side::BUY,
                order_type: OrderType::Limit,
                price: Some(Price::from_u64(50_000)),
                quantity: Quantity::from_str(quantity).unwrap(),
                time_in_force: TimeInForce::GTC,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = sample("1.0");
        assert_eq!(order.status, OrderStatus::Pending);

        order.add_fill(Quantity::from_str("0.3").unwrap(), Utc::now());
        assert_eq!(order.status, OrderStatus::Partial);
        assert!(order.check_invariant());

        order.add_fill(Quantity::from_str("0.7").unwrap(), Utc::now());
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.is_filled());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_overfill_is_clamped() {
        let mut order = sample("1.0");
        order.add_fill(Quantity::from_str("1.5").unwrap(), Utc::now());
        assert!(order.is_filled());
        assert!(order.remaining_quantity.is_zero());
        assert!(order.check_invariant());
    }

    #[test]
    fn test_cancel_terminal_is_noop() {
        let mut order = sample("1.0");
        order.add_fill(Quantity::from_str("1.0").unwrap(), Utc::now());
        assert!(!order.cancel(CancelReason::UserRequested, Utc::now()));
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(OrderStatus::Canceled(CancelReason::SelfTrade)).unwrap();
        assert_eq!(json["state"], "CANCELED");
        assert_eq!(json["reason"], "SELF_TRADE");
    }
}
