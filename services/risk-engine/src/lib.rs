//! Risk Engine Service
//!
//! Margin tiers, account health and liquidation thresholds for the
//! platform's leveraged positions. Pure functions over Decimal; the
//! margin trading service owns the state.

pub mod margin;
pub mod exposure;
pub mod liquidation;
pub mod error;
pub mod engine;

pub use engine::{PositionTerms, RiskEngine};
pub use error::RiskError;
