use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Leverage {requested}x exceeds tier maximum {max}x")]
    LeverageTooHigh { requested: u8, max: u8 },

    #[error("Leverage must be at least 1x")]
    LeverageTooLow,

    #[error("Position size must be positive")]
    InvalidSize,

    #[error("Insufficient margin: required {required}, available {available}")]
    InsufficientMargin { required: Decimal, available: Decimal },
}
