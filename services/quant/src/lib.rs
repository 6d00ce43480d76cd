//! Quantitative analytics: option and bond pricing, portfolio risk and
//! curve / surface / market-series analytics.
//!
//! Everything here is synchronous f64 math; callers on an async runtime
//! should move heavy calls (Monte Carlo, deep trees) onto a blocking pool.

pub mod analytics;
pub mod error;
pub mod pricing;
pub mod risk;
pub mod stats;

pub use error::{QuantError, QuantResult};
