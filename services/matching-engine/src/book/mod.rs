//! Order book infrastructure module
//!
//! Contains price levels, bid book, and ask book implementations.

pub mod price_level;
pub mod bid_book;
pub mod ask_book;

pub use price_level::{PriceLevel, RestingEntry};
pub use bid_book::BidBook;
pub use ask_book::AskBook;

use types::market::DepthLevel;
use types::numeric::Price;

/// Common view of one side of the book, best price first
pub trait BookSide {
    /// Best price level, mutable for matching
    fn best_level_mut(&mut self) -> Option<(Price, &mut PriceLevel)>;

    /// Drop a level once it has no orders left
    fn prune(&mut self, price: Price);

    /// Price levels in priority order
    fn levels(&self) -> Box<dyn Iterator<Item = (Price, &PriceLevel)> + '_>;

    fn depth_snapshot(&self, depth: usize) -> Vec<DepthLevel> {
        self.levels()
            .take(depth)
            .map(|(price, level)| DepthLevel {
                price: price.as_decimal(),
                quantity: level.total_quantity().as_decimal(),
                orders: level.order_count(),
            })
            .collect()
    }
}
