//! Matching logic module
//!
//! Implements price-time priority matching algorithm

pub mod crossing;
pub mod executor;

pub use crossing::{crosses, fillable_quantity};
pub use executor::{MatchError, MatchExecutor};
