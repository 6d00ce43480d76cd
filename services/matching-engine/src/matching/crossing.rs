//! Crossing detection logic
//!
//! Determines when an incoming order can trade against a resting level.

use types::ids::UserId;
use types::numeric::{Price, Quantity};
use types::order::Side;

use crate::book::BookSide;

/// Whether an incoming order with `limit` (None = market) crosses `resting`
pub fn crosses(incoming_side: Side, limit: Option<Price>, resting: Price) -> bool {
    match (incoming_side, limit) {
        (_, None) => true,
        (Side::BUY, Some(limit)) => limit >= resting,
        (Side::SELL, Some(limit)) => limit <= resting,
    }
}

/// Quantity an incoming order could fill right now, capped at `wanted`
///
/// Walks the opposite side in priority order and stops at the first
/// resting order owned by `taker`, where self-trade prevention would
/// halt matching.
pub fn fillable_quantity<B: BookSide>(
    book: &B,
    incoming_side: Side,
    limit: Option<Price>,
    taker: &UserId,
    wanted: Quantity,
) -> Quantity {
    let mut total = Quantity::zero();
    for (price, level) in book.levels() {
        if !crosses(incoming_side, limit, price) {
            break;
        }
        for entry in level.iter() {
            if &entry.user_id == taker {
                return total.min(wanted);
            }
            total = total + entry.remaining;
            if total >= wanted {
                return wanted;
            }
        }
    }
    total
}
