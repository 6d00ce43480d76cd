//! Service-layer error taxonomy
//!
//! Every variant maps to one HTTP status in the gateway. Conflict,
//! Forbidden and Unprocessable carry a stable machine-readable code.

use risk_engine::RiskError;
use thiserror::Error;
use types::errors::OrderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unprocessable,
    Forbidden,
    InsufficientFunds,
    Unavailable,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Unprocessable { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

impl PlatformError {
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(code: &'static str, message: impl Into<String>) -> Self {
        Self::Forbidden {
            code,
            message: message.into(),
        }
    }

    pub fn unprocessable(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unprocessable {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::NotFound(_) => ErrorKind::NotFound,
            PlatformError::Conflict { .. } => ErrorKind::Conflict,
            PlatformError::Validation(_) => ErrorKind::Validation,
            PlatformError::Unprocessable { .. } => ErrorKind::Unprocessable,
            PlatformError::Forbidden { .. } => ErrorKind::Forbidden,
            PlatformError::InsufficientFunds(_) => ErrorKind::InsufficientFunds,
            PlatformError::Unavailable(_) => ErrorKind::Unavailable,
            PlatformError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            PlatformError::NotFound(_) => "NOT_FOUND",
            PlatformError::Conflict { code, .. }
            | PlatformError::Unprocessable { code, .. }
            | PlatformError::Forbidden { code, .. } => code,
            PlatformError::Validation(_) => "VALIDATION_ERROR",
            PlatformError::InsufficientFunds(_) => "INSUFFICIENT_FUNDS",
            PlatformError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            PlatformError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<OrderError> for PlatformError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound { order_id } => PlatformError::NotFound(format!("order {order_id}")),
            OrderError::UnknownMarket { symbol } => PlatformError::NotFound(format!("market {symbol}")),
            OrderError::AlreadyTerminal { .. } => PlatformError::conflict("ORDER_NOT_OPEN", err.to_string()),
            OrderError::MarketExists { .. } => PlatformError::conflict("MARKET_EXISTS", err.to_string()),
            OrderError::InsufficientLiquidity => {
                PlatformError::conflict("INSUFFICIENT_LIQUIDITY", err.to_string())
            }
            OrderError::InvalidPrice(_)
            | OrderError::InvalidQuantity(_)
            | OrderError::BelowMinNotional { .. } => PlatformError::Validation(err.to_string()),
        }
    }
}

impl From<RiskError> for PlatformError {
    fn from(err: RiskError) -> Self {
        match err {
            RiskError::InsufficientMargin { .. } => PlatformError::InsufficientFunds(err.to_string()),
            RiskError::LeverageTooHigh { .. } | RiskError::LeverageTooLow | RiskError::InvalidSize => {
                PlatformError::Validation(err.to_string())
            }
        }
    }
}
