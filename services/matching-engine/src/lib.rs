//! Matching Engine Service
//!
//! Price-time priority limit order book for the platform's spot markets.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - Trades execute at the resting (maker) price
//! - Deterministic matching (same inputs, same outputs)
//! - No self-trades: the incoming order's remainder is canceled instead
//! - Conservation of quantity: filled + remaining == quantity

pub mod book;
pub mod matching;
pub mod engine;

pub use engine::{ExecutionReport, MatchingEngine, OrderFilter};
