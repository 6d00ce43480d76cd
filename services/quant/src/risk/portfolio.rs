//! Portfolio risk profile

use serde::{Deserialize, Serialize};

use super::check_weights;
use super::var::diversification_ratio;
use crate::error::QuantResult;
use crate::stats::{check_matrix, correlation_matrix, mean, percentile, std_dev, weighted_series};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub returns: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

fn default_risk_free_rate() -> f64 {
    0.02
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRisk {
    pub mean_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub var_95: f64,
    pub expected_shortfall: f64,
    pub diversification_ratio: f64,
    pub correlation_matrix: Vec<Vec<f64>>,
    pub portfolio_weights: Vec<f64>,
    pub risk_free_rate: f64,
}

/// Largest peak-to-trough fall of the compounded wealth curve (<= 0)
pub fn max_drawdown(returns: &[f64]) -> f64 {
    let mut wealth = 1.0;
    let mut peak = 1.0;
    let mut worst: f64 = 0.0;
    for r in returns {
        wealth *= 1.0 + r;
        peak = f64::max(peak, wealth);
        worst = worst.min((wealth - peak) / peak);
    }
    worst
}

pub fn analyze(request: &PortfolioRequest) -> QuantResult<PortfolioRisk> {
    check_matrix("returns", &request.returns)?;
    check_weights(&request.weights, request.returns.len())?;

    let series = weighted_series(&request.weights, &request.returns);
    let mean_return = mean(&series);
    let volatility = std_dev(&series);
    let var_95 = percentile(&series, 0.05);
    let tail: Vec<f64> = series.iter().copied().filter(|r| *r <= var_95).collect();

    Ok(PortfolioRisk {
        mean_return,
        volatility,
        sharpe_ratio: if volatility == 0.0 {
            0.0
        } else {
            (mean_return - request.risk_free_rate) / volatility
        },
        max_drawdown: max_drawdown(&series),
        var_95,
        expected_shortfall: if tail.is_empty() { var_95 } else { mean(&tail) },
        diversification_ratio: diversification_ratio(&request.weights, &request.returns, &series),
        correlation_matrix: correlation_matrix(&request.returns),
        portfolio_weights: request.weights.clone(),
        risk_free_rate: request.risk_free_rate,
    })
}
