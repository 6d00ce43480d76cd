//! Error types shared across the platform
//!
//! Comprehensive error taxonomy using thiserror

use rust_decimal::Decimal;
use thiserror::Error;

/// Identifier parsing errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdError {
    #[error("Invalid identifier: {0}")]
    InvalidUuid(String),

    #[error("Invalid tenant id: {0}")]
    InvalidTenant(String),

    #[error("Invalid market symbol: {0} (expected BASE/QUOTE)")]
    InvalidMarket(String),
}

/// Decimal newtype construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumericError {
    #[error("Price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("Quantity must not be negative, got {0}")]
    NegativeQuantity(Decimal),

    #[error("Value {0} exceeds the maximum of 1000000000000")]
    TooLarge(Decimal),

    #[error("Invalid decimal: {0}")]
    Parse(String),
}

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Order not found: {order_id}")]
    NotFound { order_id: String },

    #[error("Order already in terminal state: {status}")]
    AlreadyTerminal { status: String },

    #[error("Unknown market: {symbol}")]
    UnknownMarket { symbol: String },

    #[error("Market already listed: {symbol}")]
    MarketExists { symbol: String },

    #[error("Notional {notional} below market minimum {minimum}")]
    BelowMinNotional { notional: Decimal, minimum: Decimal },

    #[error("Insufficient liquidity to fill order")]
    InsufficientLiquidity,
}
