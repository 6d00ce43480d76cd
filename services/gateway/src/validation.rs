//! Request validation
//!
//! Bodies and queries are deserialized first, then checked by their
//! [`Validate`] impl. Both failure modes surface as 400 `VALIDATION_ERROR`.

use std::fmt::Display;

use axum::extract::{FromRequest, FromRequestParts, Json, Path, Query, Request};
use axum::http::request::Parts;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use types::numeric::MAX_MAGNITUDE;

use crate::error::AppError;

pub type ValidationResult = Result<(), String>;

pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

/// JSON body that passed [`Validate`]
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate().map_err(AppError::Validation)?;
        Ok(ValidatedJson(value))
    }
}

/// Query string that passed [`Validate`]
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        value.validate().map_err(AppError::Validation)?;
        Ok(ValidatedQuery(value))
    }
}

/// Path parameters; malformed ids are a 400 in the standard envelope
#[derive(Debug, Clone)]
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(ValidPath(value))
    }
}

fn bounded(field: &str, value: Decimal) -> ValidationResult {
    if value > MAX_MAGNITUDE {
        Err(format!("{field} must not exceed {MAX_MAGNITUDE}"))
    } else {
        Ok(())
    }
}

/// Greater than zero and at most `MAX_MAGNITUDE`
pub fn positive(field: &str, value: Decimal) -> ValidationResult {
    if value > Decimal::ZERO {
        bounded(field, value)
    } else {
        Err(format!("{field} must be positive"))
    }
}

pub fn non_negative(field: &str, value: Decimal) -> ValidationResult {
    if value >= Decimal::ZERO {
        bounded(field, value)
    } else {
        Err(format!("{field} must not be negative"))
    }
}

pub fn positive_f64(field: &str, value: f64) -> ValidationResult {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{field} must be a positive number"))
    }
}

pub fn non_negative_f64(field: &str, value: f64) -> ValidationResult {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{field} must not be negative"))
    }
}

pub fn in_range<T: PartialOrd + Display>(field: &str, value: T, min: T, max: T) -> ValidationResult {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(format!("{field} must be between {min} and {max}"))
    }
}

/// Character count in `min..=max` after trimming
pub fn text(field: &str, value: &str, min: usize, max: usize) -> ValidationResult {
    let len = value.trim().chars().count();
    if len == 0 {
        Err(format!("{field} must not be empty"))
    } else if len < min || len > max {
        Err(format!("{field} must be {min} to {max} characters"))
    } else {
        Ok(())
    }
}

pub fn non_empty(field: &str, value: &str, max: usize) -> ValidationResult {
    text(field, value, 1, max)
}

/// `0x` followed by 40 hex characters
pub fn evm_address(field: &str, value: &str) -> ValidationResult {
    if types::wallet::is_evm_address(value) {
        Ok(())
    } else {
        Err(format!("{field} must be a 0x-prefixed 40 character hex address"))
    }
}

/// ISO 3166-1 alpha-2 shape
pub fn country_code(field: &str, value: &str) -> ValidationResult {
    if value.len() == 2 && value.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(format!("{field} must be an ISO 3166 alpha-2 code"))
    }
}

/// `[A-Z0-9]{2,10}`
pub fn token_symbol(field: &str, value: &str) -> ValidationResult {
    let ok = (2..=10).contains(&value.len()) && value.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if ok {
        Ok(())
    } else {
        Err(format!("{field} must be 2-10 uppercase letters or digits"))
    }
}

pub fn alphanumeric(field: &str, value: &str, min: usize, max: usize) -> ValidationResult {
    if (min..=max).contains(&value.len()) && value.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(format!("{field} must be {min} to {max} letters or digits"))
    }
}

pub fn same_length(field: &str, a: usize, b: usize) -> ValidationResult {
    if a == b {
        Ok(())
    } else {
        Err(format!("{field} lengths differ ({a} vs {b})"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_checks() {
        assert!(positive("amount", dec!(0.01)).is_ok());
        assert_eq!(positive("amount", dec!(0)).unwrap_err(), "amount must be positive");
        assert!(non_negative("fee", dec!(0)).is_ok());
        assert!(non_negative("fee", dec!(-1)).is_err());
        assert!(positive("amount", dec!(1_000_000_000_000)).is_ok());
        assert_eq!(
            positive("amount", dec!(1_000_000_000_000.01)).unwrap_err(),
            "amount must not exceed 1000000000000"
        );
        assert!(non_negative("min_amount_out", Decimal::MAX).is_err());
    }

    #[test]
    fn test_float_checks_reject_nan() {
        assert!(positive_f64("spot_price", 100.0).is_ok());
        assert!(positive_f64("spot_price", f64::NAN).is_err());
        assert!(positive_f64("spot_price", 0.0).is_err());
        assert!(non_negative_f64("risk_free_rate", 0.0).is_ok());
    }

    #[test]
    fn test_range_and_text() {
        assert!(in_range("depth", 20, 1, 100).is_ok());
        assert_eq!(in_range("depth", 0, 1, 100).unwrap_err(), "depth must be between 1 and 100");
        assert!(text("full_name", "Al", 2, 120).is_ok());
        assert!(text("full_name", "A", 2, 120).is_err());
        assert_eq!(non_empty("title", "   ", 10).unwrap_err(), "title must not be empty");
    }

    #[test]
    fn test_identifier_shapes() {
        assert!(evm_address("recipient", "0x52908400098527886E0F7030069857D2E4169EE7").is_ok());
        assert!(evm_address("recipient", "0x1234").is_err());
        assert!(country_code("country", "DE").is_ok());
        assert!(country_code("country", "de").is_err());
        assert!(country_code("country", "DEU").is_err());
        assert!(token_symbol("token_in", "USDT").is_ok());
        assert!(token_symbol("token_in", "usdt").is_err());
        assert!(token_symbol("token_in", "X").is_err());
        assert!(alphanumeric("document_number", "AB12345", 4, 32).is_ok());
        assert!(alphanumeric("document_number", "AB-1", 4, 32).is_err());
    }
}
