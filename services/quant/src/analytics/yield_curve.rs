//! Yield curve construction, forward rates and zero-curve bootstrapping

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::interpolation::{Interpolator, Method};
use super::{check_axis, linspace};
use crate::error::{ensure_finite, invalid, QuantError, QuantResult};
use crate::pricing::bond::FREQUENCIES;
use crate::stats::{mean, std_dev};

pub const CURVE_POINTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveRequest {
    /// Years, strictly increasing
    pub maturities: Vec<f64>,
    pub yields: Vec<f64>,
    #[serde(default = "default_method")]
    pub interpolation_method: Method,
}

fn default_method() -> Method {
    Method::Cubic
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveMetrics {
    pub mean_yield: f64,
    pub std_yield: f64,
    pub min_yield: f64,
    pub max_yield: f64,
    pub slope_2y_10y: f64,
    /// 2 * y5 - y2 - y10; needs three or more points
    pub curvature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldCurve {
    pub maturities: Vec<f64>,
    pub yields: Vec<f64>,
    pub curve_maturities: Vec<f64>,
    pub curve_yields: Vec<f64>,
    pub interpolation_method: Method,
    pub metrics: CurveMetrics,
    pub data_points: usize,
}

fn check_curve(maturities: &[f64], rates: &[f64], rates_field: &'static str) -> QuantResult<()> {
    check_axis("maturities", maturities, 2)?;
    if maturities[0] <= 0.0 {
        return Err(invalid("maturities", "must be positive"));
    }
    if rates.len() != maturities.len() {
        return Err(QuantError::DimensionMismatch(format!(
            "{} {rates_field} for {} maturities",
            rates.len(),
            maturities.len()
        )));
    }
    ensure_finite(rates_field, rates)
}

/// Yield at the knot whose maturity is closest to `target`
fn nearest_knot(maturities: &[f64], yields: &[f64], target: f64) -> f64 {
    maturities
        .iter()
        .zip(yields)
        .min_by(|a, b| (a.0 - target).abs().total_cmp(&(b.0 - target).abs()))
        .map_or(0.0, |(_, y)| *y)
}

pub fn build(request: &CurveRequest) -> QuantResult<YieldCurve> {
    check_curve(&request.maturities, &request.yields, "yields")?;
    let (ts, ys) = (&request.maturities, &request.yields);
    let f = Interpolator::new(request.interpolation_method, ts, ys);

    let curve_maturities = linspace(ts[0], ts[ts.len() - 1], CURVE_POINTS);
    let curve_yields = curve_maturities.iter().map(|t| f.eval(*t)).collect();

    let y2 = nearest_knot(ts, ys, 2.0);
    let y5 = nearest_knot(ts, ys, 5.0);
    let y10 = nearest_knot(ts, ys, 10.0);
    let metrics = CurveMetrics {
        mean_yield: mean(ys),
        std_yield: std_dev(ys),
        min_yield: ys.iter().copied().fold(f64::INFINITY, f64::min),
        max_yield: ys.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        slope_2y_10y: y10 - y2,
        curvature: (ys.len() >= 3).then(|| 2.0 * y5 - y2 - y10),
    };

    Ok(YieldCurve {
        maturities: ts.clone(),
        yields: ys.clone(),
        curve_maturities,
        curve_yields,
        interpolation_method: request.interpolation_method,
        metrics,
        data_points: ts.len(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn methods() -> Vec<MethodInfo> {
    Method::ALL
        .iter()
        .map(|m| MethodInfo {
            name: m.as_str(),
            description: m.description(),
        })
        .collect()
}

pub const DEFAULT_FORWARD_PERIODS: [(f64, f64); 4] = [(1.0, 2.0), (2.0, 3.0), (5.0, 6.0), (10.0, 11.0)];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub maturities: Vec<f64>,
    pub yields: Vec<f64>,
    /// `[start, end]` pairs in years
    #[serde(default)]
    pub periods: Option<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForwardRate {
    pub start: f64,
    pub end: f64,
    pub forward_rate: f64,
}

/// Implied forwards from linearly interpolated spot yields
pub fn forward_rates(request: &ForwardRequest) -> QuantResult<Vec<ForwardRate>> {
    check_curve(&request.maturities, &request.yields, "yields")?;
    let f = Interpolator::new(Method::Linear, &request.maturities, &request.yields);
    let periods = request
        .periods
        .clone()
        .unwrap_or_else(|| DEFAULT_FORWARD_PERIODS.to_vec());

    periods
        .into_iter()
        .map(|(start, end)| {
            if !(start >= 0.0 && end > start && end.is_finite()) {
                return Err(invalid("periods", format!("need 0 <= start < end, got ({start}, {end})")));
            }
            let forward_rate = (f.eval(end) * end - f.eval(start) * start) / (end - start);
            Ok(ForwardRate {
                start,
                end,
                forward_rate,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapRequest {
    pub maturities: Vec<f64>,
    /// Par coupon rates
    pub par_rates: Vec<f64>,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

fn default_frequency() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZeroCurve {
    pub maturities: Vec<f64>,
    pub par_rates: Vec<f64>,
    pub zero_rates: Vec<f64>,
    pub discount_factors: Vec<f64>,
    pub frequency: u32,
}

struct Pillars {
    times: Vec<f64>,
    zeros: Vec<f64>,
}

impl Pillars {
    /// Zero rate at `t` with `z_last` as a trial value for pillar `t_last`
    fn zero_at(&self, t: f64, t_last: f64, z_last: f64) -> f64 {
        let Some((&t_prev, &z_prev)) = self.times.last().zip(self.zeros.last()) else {
            return z_last;
        };
        if t >= t_last {
            return z_last;
        }
        if t > t_prev {
            return z_prev + (z_last - z_prev) * (t - t_prev) / (t_last - t_prev);
        }
        Interpolator::new(Method::Linear, &self.times, &self.zeros).eval(t)
    }
}

fn discount_factor(zero: f64, t: f64, frequency: f64) -> f64 {
    (1.0 + zero / frequency).powf(-frequency * t)
}

/// Coupon dates k/f strictly before `maturity`, then `maturity` itself
fn coupon_schedule(maturity: f64, frequency: f64) -> Vec<f64> {
    let mut times: Vec<f64> = (1..)
        .map(|k| k as f64 / frequency)
        .take_while(|t| *t < maturity - 1e-9)
        .collect();
    times.push(maturity);
    times
}

/// Par bootstrap with periodic compounding
///
/// Each pillar's zero rate is solved by bisection so that a bond paying
/// the par rate prices at 1.
pub fn bootstrap_zero(request: &BootstrapRequest) -> QuantResult<ZeroCurve> {
    check_curve(&request.maturities, &request.par_rates, "par_rates")?;
    if !FREQUENCIES.contains(&request.frequency) {
        return Err(invalid("frequency", format!("must be one of {FREQUENCIES:?}")));
    }
    let freq = request.frequency as f64;
    let mut pillars = Pillars {
        times: Vec::with_capacity(request.maturities.len()),
        zeros: Vec::with_capacity(request.maturities.len()),
    };

    for (&maturity, &par) in request.maturities.iter().zip(&request.par_rates) {
        let schedule = coupon_schedule(maturity, freq);
        let bond_value = |z: f64| -> f64 {
            let mut prev = 0.0;
            let mut value = 0.0;
            for &t in &schedule {
                let df = discount_factor(pillars.zero_at(t, maturity, z), t, freq);
                value += par * (t - prev) * df;
                prev = t;
            }
            value + discount_factor(z, maturity, freq)
        };

        // value falls as z rises
        let (mut lo, mut hi) = (-0.5, 2.0);
        if bond_value(lo) < 1.0 || bond_value(hi) > 1.0 {
            return Err(invalid("par_rates", format!("no zero rate reproduces par at {maturity}y")));
        }
        let mut z = 0.5 * (lo + hi);
        for _ in 0..200 {
            z = 0.5 * (lo + hi);
            let diff = bond_value(z) - 1.0;
            if diff.abs() < 1e-14 || hi - lo < 1e-15 {
                break;
            }
            if diff > 0.0 {
                lo = z;
            } else {
                hi = z;
            }
        }
        debug!(maturity, par, zero = z, "bootstrapped pillar");
        pillars.times.push(maturity);
        pillars.zeros.push(z);
    }

    let discount_factors = pillars
        .times
        .iter()
        .zip(&pillars.zeros)
        .map(|(t, z)| discount_factor(*z, *t, freq))
        .collect();

    Ok(ZeroCurve {
        maturities: request.maturities.clone(),
        par_rates: request.par_rates.clone(),
        zero_rates: pillars.zeros,
        discount_factors,
        frequency: request.frequency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> (Vec<f64>, Vec<f64>) {
        (
            vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0],
            vec![0.040, 0.042, 0.045, 0.048, 0.050, 0.052],
        )
    }

    #[test]
    fn test_build_curve_and_metrics() {
        let (maturities, yields) = curve();
        let built = build(&CurveRequest {
            maturities,
            yields,
            interpolation_method: Method::Cubic,
        })
        .unwrap();
        assert_eq!(built.curve_yields.len(), CURVE_POINTS);
        assert_eq!(built.curve_maturities[0], 0.5);
        assert_eq!(built.curve_maturities[CURVE_POINTS - 1], 30.0);
        assert!((built.metrics.slope_2y_10y - 0.005).abs() < 1e-12);
        assert!((built.metrics.curvature.unwrap() - (2.0 * 0.048 - 0.045 - 0.050)).abs() < 1e-12);
        assert_eq!(built.metrics.min_yield, 0.040);
        assert_eq!(built.data_points, 6);
    }

    #[test]
    fn test_two_points_have_no_curvature() {
        let built = build(&CurveRequest {
            maturities: vec![1.0, 10.0],
            yields: vec![0.03, 0.04],
            interpolation_method: Method::Linear,
        })
        .unwrap();
        assert!(built.metrics.curvature.is_none());
    }

    #[test]
    fn test_rejects_unsorted_maturities() {
        let err = build(&CurveRequest {
            maturities: vec![2.0, 1.0],
            yields: vec![0.03, 0.04],
            interpolation_method: Method::Linear,
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_forward_rates_default_periods() {
        let (maturities, yields) = curve();
        let fwd = forward_rates(&ForwardRequest {
            maturities,
            yields,
            periods: None,
        })
        .unwrap();
        assert_eq!(fwd.len(), 4);
        // (0.045*2 - 0.042*1) / 1
        assert!((fwd[0].forward_rate - 0.048).abs() < 1e-12);
        assert!(fwd.iter().all(|f| f.forward_rate > 0.0));
    }

    #[test]
    fn test_flat_curve_has_flat_forwards() {
        let fwd = forward_rates(&ForwardRequest {
            maturities: vec![1.0, 5.0, 10.0],
            yields: vec![0.03; 3],
            periods: Some(vec![(0.0, 1.0), (3.0, 7.0), (10.0, 20.0)]),
        })
        .unwrap();
        for f in fwd {
            assert!((f.forward_rate - 0.03).abs() < 1e-12);
        }
    }

    #[test]
    fn test_flat_par_curve_bootstraps_flat() {
        let zero = bootstrap_zero(&BootstrapRequest {
            maturities: vec![0.5, 1.0, 2.0, 5.0, 10.0],
            par_rates: vec![0.05; 5],
            frequency: 2,
        })
        .unwrap();
        for (z, t) in zero.zero_rates.iter().zip(&zero.maturities) {
            assert!((z - 0.05).abs() < 1e-9, "zero at {t}: {z}");
        }
        assert!((zero.discount_factors[0] - 1.0 / 1.025).abs() < 1e-9);
    }

    #[test]
    fn test_upward_par_curve_gives_higher_zeros() {
        let zero = bootstrap_zero(&BootstrapRequest {
            maturities: vec![1.0, 2.0, 3.0, 5.0],
            par_rates: vec![0.03, 0.035, 0.04, 0.045],
            frequency: 1,
        })
        .unwrap();
        assert!((zero.zero_rates[0] - 0.03).abs() < 1e-9);
        for i in 1..4 {
            assert!(zero.zero_rates[i] >= zero.par_rates[i]);
        }
        assert!(zero.discount_factors.windows(2).all(|w| w[1] < w[0]));
    }
}
