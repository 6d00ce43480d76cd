use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("{0} did not converge")]
    NoConvergence(&'static str),
}

pub type QuantResult<T> = Result<T, QuantError>;

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> QuantError {
    QuantError::InvalidInput {
        field,
        reason: reason.into(),
    }
}

/// Fails unless `value` is finite and strictly positive
pub(crate) fn ensure_positive(field: &'static str, value: f64) -> QuantResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {value}")))
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> QuantResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must not be negative, got {value}")))
    }
}

pub(crate) fn ensure_finite(field: &'static str, values: &[f64]) -> QuantResult<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(invalid(field, "contains a non-finite value"))
    }
}
