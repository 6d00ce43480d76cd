//! Value-at-risk and expected shortfall
//!
//! `confidence_level` is the tail probability (0.05 for 95% VaR). Results
//! follow the return sign convention, so losses come out negative.

use serde::{Deserialize, Serialize};

use super::{check_confidence, check_weights};
use crate::error::{ensure_finite, ensure_positive, invalid, QuantResult};
use crate::pricing::monte_carlo::NormalSampler;
use crate::stats::{self, correlation_matrix, mean, norm_inv, percentile, std_dev, Summary};

pub const DEFAULT_SIMULATIONS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    Historical,
    Parametric,
    MonteCarlo,
}

impl VarMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::MonteCarlo => "monte_carlo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRequest {
    pub returns: Vec<f64>,
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
    /// Days
    #[serde(default = "default_horizon")]
    pub time_horizon: u32,
    #[serde(default = "default_method")]
    pub method: VarMethod,
    #[serde(default = "default_portfolio_value")]
    pub portfolio_value: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_confidence() -> f64 {
    0.05
}

fn default_horizon() -> u32 {
    1
}

fn default_method() -> VarMethod {
    VarMethod::Historical
}

fn default_portfolio_value() -> f64 {
    1_000_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarReport {
    pub var_relative: f64,
    pub var_absolute: f64,
    pub expected_shortfall: f64,
    pub confidence_level: f64,
    pub time_horizon: u32,
    pub method: VarMethod,
    pub portfolio_value: f64,
    pub statistics: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioVarReport {
    #[serde(flatten)]
    pub var: VarReport,
    pub weights: Vec<f64>,
    pub correlation_matrix: Vec<Vec<f64>>,
    pub diversification_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodInfo {
    pub name: &'static str,
    pub description: &'static str,
}

pub fn methods() -> Vec<MethodInfo> {
    vec![
        MethodInfo {
            name: VarMethod::Historical.as_str(),
            description: "Empirical percentile of observed returns scaled by sqrt(horizon)",
        },
        MethodInfo {
            name: VarMethod::Parametric.as_str(),
            description: "Normal approximation from the sample mean and volatility",
        },
        MethodInfo {
            name: VarMethod::MonteCarlo.as_str(),
            description: "Seeded normal simulation calibrated to the sample moments",
        },
    ]
}

fn relative_var(scaled: &[f64], horizon: f64, request: &VarRequest) -> f64 {
    let (mu, sigma) = (mean(&request.returns), std_dev(&request.returns));
    match request.method {
        VarMethod::Historical => percentile(scaled, request.confidence_level),
        VarMethod::Parametric => mu * horizon + norm_inv(request.confidence_level) * sigma * horizon.sqrt(),
        VarMethod::MonteCarlo => {
            let mut sampler = NormalSampler::new(request.seed.unwrap_or(42));
            let simulated: Vec<f64> = (0..DEFAULT_SIMULATIONS)
                .map(|_| mu * horizon + sigma * horizon.sqrt() * sampler.next())
                .collect();
            percentile(&simulated, request.confidence_level)
        }
    }
}

pub fn calculate(request: &VarRequest) -> QuantResult<VarReport> {
    if request.returns.len() < 2 {
        return Err(invalid("returns", "need at least 2 observations"));
    }
    ensure_finite("returns", &request.returns)?;
    check_confidence(request.confidence_level)?;
    ensure_positive("portfolio_value", request.portfolio_value)?;
    if request.time_horizon == 0 {
        return Err(invalid("time_horizon", "must be at least 1 day"));
    }

    let horizon = request.time_horizon as f64;
    let scaled: Vec<f64> = request.returns.iter().map(|r| r * horizon.sqrt()).collect();
    let var_relative = relative_var(&scaled, horizon, request);

    // ES averages the observed tail whichever method produced the VaR
    let threshold = percentile(&scaled, request.confidence_level);
    let tail: Vec<f64> = scaled.iter().copied().filter(|r| *r <= threshold).collect();
    let es_relative = if tail.is_empty() { var_relative } else { mean(&tail) };

    Ok(VarReport {
        var_relative,
        var_absolute: var_relative * request.portfolio_value,
        expected_shortfall: es_relative * request.portfolio_value,
        confidence_level: request.confidence_level,
        time_horizon: request.time_horizon,
        method: request.method,
        portfolio_value: request.portfolio_value,
        statistics: stats::summary(&request.returns),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioVarRequest {
    /// One return series per asset
    pub returns: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
    #[serde(default = "default_horizon")]
    pub time_horizon: u32,
    #[serde(default = "default_method")]
    pub method: VarMethod,
    #[serde(default = "default_portfolio_value")]
    pub portfolio_value: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// VaR of the weighted portfolio return series
pub fn portfolio(request: &PortfolioVarRequest) -> QuantResult<PortfolioVarReport> {
    stats::check_matrix("returns", &request.returns)?;
    check_weights(&request.weights, request.returns.len())?;

    let series = stats::weighted_series(&request.weights, &request.returns);
    let var = calculate(&VarRequest {
        returns: series.clone(),
        confidence_level: request.confidence_level,
        time_horizon: request.time_horizon,
        method: request.method,
        portfolio_value: request.portfolio_value,
        seed: request.seed,
    })?;

    Ok(PortfolioVarReport {
        var,
        weights: request.weights.clone(),
        correlation_matrix: correlation_matrix(&request.returns),
        diversification_ratio: diversification_ratio(&request.weights, &request.returns, &series),
    })
}

/// Weighted average asset volatility over portfolio volatility
pub(crate) fn diversification_ratio(weights: &[f64], rows: &[Vec<f64>], portfolio: &[f64]) -> f64 {
    let weighted: f64 = weights.iter().zip(rows).map(|(w, r)| w * std_dev(r)).sum();
    let sigma_p = std_dev(portfolio);
    if sigma_p == 0.0 {
        1.0
    } else {
        weighted / sigma_p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn returns() -> Vec<f64> {
        (0..250)
            .map(|i| ((i * 37 % 101) as f64 - 50.0) / 2500.0)
            .collect()
    }

    fn request(method: VarMethod) -> VarRequest {
        VarRequest {
            returns: returns(),
            confidence_level: 0.05,
            time_horizon: 1,
            method,
            portfolio_value: 1_000_000.0,
            seed: None,
        }
    }

    #[test]
    fn test_losses_are_negative() {
        for method in [VarMethod::Historical, VarMethod::Parametric, VarMethod::MonteCarlo] {
            let report = calculate(&request(method)).unwrap();
            assert!(report.var_relative < 0.0, "{method:?}");
            assert!(report.expected_shortfall < 0.0, "{method:?}");
            assert_eq!(report.var_absolute, report.var_relative * 1_000_000.0);
        }
    }

    #[test]
    fn test_historical_shortfall_is_beyond_var() {
        let report = calculate(&request(VarMethod::Historical)).unwrap();
        assert!(report.expected_shortfall <= report.var_absolute);
    }

    #[test]
    fn test_shortfall_uses_observed_tail_for_every_method() {
        let mut req = request(VarMethod::Parametric);
        req.returns = vec![-0.02, -0.01, 0.0, 0.01, 0.02];
        let parametric = calculate(&req).unwrap();
        // normal VaR sits below every observation, yet ES is the worst observed return
        assert!(parametric.var_relative < -0.02);
        assert!((parametric.expected_shortfall - -20_000.0).abs() < 1e-6);

        req.method = VarMethod::Historical;
        let historical = calculate(&req).unwrap();
        assert_eq!(historical.expected_shortfall, parametric.expected_shortfall);
    }

    #[test]
    fn test_parametric_matches_formula() {
        let r = returns();
        let report = calculate(&request(VarMethod::Parametric)).unwrap();
        let expected = mean(&r) - 1.644_853_6 * std_dev(&r);
        assert!((report.var_relative - expected).abs() < 1e-6);
    }

    #[test]
    fn test_horizon_scales_historical_by_sqrt() {
        let one = calculate(&request(VarMethod::Historical)).unwrap();
        let mut req = request(VarMethod::Historical);
        req.time_horizon = 4;
        let four = calculate(&req).unwrap();
        assert!((four.var_relative - 2.0 * one.var_relative).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut req = request(VarMethod::Historical);
        req.confidence_level = 1.5;
        assert!(calculate(&req).is_err());
        req.confidence_level = 0.05;
        req.returns = vec![0.01];
        assert!(calculate(&req).is_err());
    }

    #[test]
    fn test_portfolio_diversifies() {
        let a = returns();
        let b: Vec<f64> = a.iter().rev().copied().collect();
        let report = portfolio(&PortfolioVarRequest {
            returns: vec![a, b],
            weights: vec![0.5, 0.5],
            confidence_level: 0.05,
            time_horizon: 1,
            method: VarMethod::Parametric,
            portfolio_value: 1_000_000.0,
            seed: None,
        })
        .unwrap();
        assert!(report.diversification_ratio >= 1.0);
        assert_eq!(report.correlation_matrix[0][0], 1.0);
    }

    #[test]
    fn test_portfolio_weight_mismatch() {
        let err = portfolio(&PortfolioVarRequest {
            returns: vec![returns(), returns()],
            weights: vec![1.0],
            confidence_level: 0.05,
            time_horizon: 1,
            method: VarMethod::Historical,
            portfolio_value: 1.0,
            seed: None,
        });
        assert!(matches!(err, Err(crate::QuantError::DimensionMismatch(_))));
    }
}
