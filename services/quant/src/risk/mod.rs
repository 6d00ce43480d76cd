//! Value-at-risk, portfolio metrics and scenario stress testing

pub mod var;
pub mod portfolio;
pub mod stress;

use crate::error::{invalid, QuantResult};

pub(crate) fn check_confidence(confidence: f64) -> QuantResult<()> {
    if (0.0..1.0).contains(&confidence) && confidence > 0.0 {
        Ok(())
    } else {
        Err(invalid("confidence_level", format!("must lie in (0, 1), got {confidence}")))
    }
}

pub(crate) fn check_weights(weights: &[f64], assets: usize) -> QuantResult<()> {
    if weights.len() != assets {
        return Err(crate::QuantError::DimensionMismatch(format!(
            "{} weights for {assets} assets",
            weights.len()
        )));
    }
    crate::error::ensure_finite("weights", weights)
}
