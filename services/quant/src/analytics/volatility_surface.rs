//! Implied volatility surfaces (rows are maturities, columns strikes)

use serde::{Deserialize, Serialize};

use super::check_axis;
use crate::error::{ensure_finite, ensure_positive, QuantError, QuantResult};
use crate::stats::{mean, std_dev};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub strikes: Vec<f64>,
    pub maturities: Vec<f64>,
    /// `volatilities[maturity][strike]`
    pub volatilities: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceStatistics {
    pub mean_volatility: f64,
    pub std_volatility: f64,
    pub min_volatility: f64,
    pub max_volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Smile {
    pub maturity: f64,
    pub volatilities: Vec<f64>,
    pub min_volatility: f64,
    /// Highest strike vol minus lowest strike vol
    pub skew: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceAnalysis {
    pub strikes: Vec<f64>,
    pub maturities: Vec<f64>,
    pub volatilities: Vec<Vec<f64>>,
    pub statistics: SurfaceStatistics,
    pub volatility_smiles: Vec<Smile>,
}

impl Surface {
    pub fn validate(&self) -> QuantResult<()> {
        check_axis("strikes", &self.strikes, 2)?;
        check_axis("maturities", &self.maturities, 1)?;
        ensure_positive("strikes", self.strikes[0])?;
        ensure_positive("maturities", self.maturities[0])?;
        if self.volatilities.len() != self.maturities.len() {
            return Err(QuantError::DimensionMismatch(format!(
                "{} volatility rows for {} maturities",
                self.volatilities.len(),
                self.maturities.len()
            )));
        }
        for row in &self.volatilities {
            if row.len() != self.strikes.len() {
                return Err(QuantError::DimensionMismatch(format!(
                    "volatility row has {} entries for {} strikes",
                    row.len(),
                    self.strikes.len()
                )));
            }
            ensure_finite("volatilities", row)?;
            if row.iter().any(|v| *v <= 0.0) {
                return Err(crate::error::invalid("volatilities", "must be positive"));
            }
        }
        Ok(())
    }

    /// Bilinear interpolation, clamped to the grid edges
    pub fn interpolate(&self, strike: f64, maturity: f64) -> QuantResult<f64> {
        self.validate()?;
        ensure_positive("strike", strike)?;
        ensure_positive("maturity", maturity)?;

        let (k0, k1, wk) = bracket(&self.strikes, strike);
        let (t0, t1, wt) = bracket(&self.maturities, maturity);
        let v = &self.volatilities;
        let near = v[t0][k0] * (1.0 - wk) + v[t0][k1] * wk;
        let far = v[t1][k0] * (1.0 - wk) + v[t1][k1] * wk;
        Ok(near * (1.0 - wt) + far * wt)
    }

    pub fn analyze(&self) -> QuantResult<SurfaceAnalysis> {
        self.validate()?;
        let flat: Vec<f64> = self.volatilities.iter().flatten().copied().collect();
        let statistics = SurfaceStatistics {
            mean_volatility: mean(&flat),
            std_volatility: std_dev(&flat),
            min_volatility: flat.iter().copied().fold(f64::INFINITY, f64::min),
            max_volatility: flat.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        };
        let volatility_smiles = self
            .maturities
            .iter()
            .zip(&self.volatilities)
            .map(|(&maturity, row)| Smile {
                maturity,
                volatilities: row.clone(),
                min_volatility: row.iter().copied().fold(f64::INFINITY, f64::min),
                skew: row[row.len() - 1] - row[0],
            })
            .collect();

        Ok(SurfaceAnalysis {
            strikes: self.strikes.clone(),
            maturities: self.maturities.clone(),
            volatilities: self.volatilities.clone(),
            statistics,
            volatility_smiles,
        })
    }
}

/// Lower index, upper index and weight of `x` on the axis
fn bracket(axis: &[f64], x: f64) -> (usize, usize, f64) {
    let last = axis.len() - 1;
    if last == 0 || x <= axis[0] {
        return (0, 0, 0.0);
    }
    if x >= axis[last] {
        return (last, last, 0.0);
    }
    let hi = axis.partition_point(|k| *k <= x);
    let lo = hi - 1;
    (lo, hi, (x - axis[lo]) / (axis[hi] - axis[lo]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Surface {
        Surface {
            strikes: vec![90.0, 100.0, 110.0],
            maturities: vec![0.25, 1.0],
            volatilities: vec![vec![0.25, 0.20, 0.22], vec![0.23, 0.19, 0.21]],
        }
    }

    #[test]
    fn test_interpolate_on_grid_and_between() {
        let s = surface();
        assert!((s.interpolate(100.0, 0.25).unwrap() - 0.20).abs() < 1e-12);
        // halfway in both dimensions between (100, 0.25) and (110, 1.0)
        let v = s.interpolate(105.0, 0.625).unwrap();
        let expected = 0.5 * (0.5 * 0.20 + 0.5 * 0.22) + 0.5 * (0.5 * 0.19 + 0.5 * 0.21);
        assert!((v - expected).abs() < 1e-12);
    }

    #[test]
    fn test_interpolate_clamps_outside_grid() {
        let s = surface();
        assert_eq!(s.interpolate(50.0, 0.1).unwrap(), 0.25);
        assert_eq!(s.interpolate(500.0, 5.0).unwrap(), 0.21);
    }

    #[test]
    fn test_analyze() {
        let a = surface().analyze().unwrap();
        assert_eq!(a.statistics.min_volatility, 0.19);
        assert_eq!(a.statistics.max_volatility, 0.25);
        assert_eq!(a.volatility_smiles.len(), 2);
        assert!((a.volatility_smiles[0].skew + 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch() {
        let mut s = surface();
        s.volatilities[1].pop();
        assert!(matches!(s.analyze(), Err(QuantError::DimensionMismatch(_))));
    }
}
