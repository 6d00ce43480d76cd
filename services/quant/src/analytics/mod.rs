//! Curve, surface and market-series analytics

pub mod interpolation;
pub mod yield_curve;
pub mod volatility_surface;
pub mod market;

use crate::error::{ensure_finite, invalid, QuantResult};

/// Knots must be finite and strictly increasing
pub(crate) fn check_axis(field: &'static str, xs: &[f64], min_len: usize) -> QuantResult<()> {
    if xs.len() < min_len {
        return Err(invalid(field, format!("need at least {min_len} points, got {}", xs.len())));
    }
    ensure_finite(field, xs)?;
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(invalid(field, "must be strictly increasing"));
    }
    Ok(())
}

/// `count` evenly spaced points spanning [lo, hi]
pub(crate) fn linspace(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (count - 1) as f64;
            (0..count).map(|i| lo + step * i as f64).collect()
        }
    }
}
