//! Scenario stress testing against a weighted portfolio

use serde::{Deserialize, Serialize};

use super::check_weights;
use crate::error::{ensure_positive, QuantResult};
use crate::stats::{check_matrix, mean};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Per-asset shock as a return, e.g. -0.3 for a 30% fall
    pub shocks: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRequest {
    pub returns: Vec<Vec<f64>>,
    pub weights: Vec<f64>,
    pub scenarios: Vec<Scenario>,
    #[serde(default = "default_portfolio_value")]
    pub portfolio_value: f64,
}

fn default_portfolio_value() -> f64 {
    1_000_000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub scenario: String,
    pub stressed_value: f64,
    pub loss: f64,
    pub loss_percentage: f64,
    pub stressed_return: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedScenario {
    pub scenario: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressSummary {
    pub max_loss: f64,
    pub max_loss_percentage: f64,
    pub num_scenarios: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StressReport {
    pub baseline_return: f64,
    pub baseline_value: f64,
    pub scenarios: Vec<ScenarioResult>,
    pub skipped: Vec<SkippedScenario>,
    pub summary: StressSummary,
}

/// Apply each scenario's shocks to the baseline portfolio
///
/// Scenarios whose shock vector does not match the asset count are
/// reported in `skipped` rather than failing the whole request.
pub fn run(request: &StressRequest) -> QuantResult<StressReport> {
    check_matrix("returns", &request.returns)?;
    check_weights(&request.weights, request.returns.len())?;
    ensure_positive("portfolio_value", request.portfolio_value)?;

    let baseline_return: f64 = request
        .weights
        .iter()
        .zip(&request.returns)
        .map(|(w, r)| w * mean(r))
        .sum();
    let baseline_value = request.portfolio_value * (1.0 + baseline_return);

    let mut scenarios = Vec::with_capacity(request.scenarios.len());
    let mut skipped = Vec::new();
    for scenario in &request.scenarios {
        if scenario.shocks.len() != request.weights.len() {
            skipped.push(SkippedScenario {
                scenario: scenario.name.clone(),
                reason: format!(
                    "{} shocks for {} assets",
                    scenario.shocks.len(),
                    request.weights.len()
                ),
            });
            continue;
        }
        let stressed_return: f64 = request
            .weights
            .iter()
            .zip(&scenario.shocks)
            .map(|(w, s)| w * s)
            .sum();
        let stressed_value = baseline_value * (1.0 + stressed_return);
        let loss = baseline_value - stressed_value;
        scenarios.push(ScenarioResult {
            scenario: scenario.name.clone(),
            stressed_value,
            loss,
            loss_percentage: if baseline_value == 0.0 { 0.0 } else { loss / baseline_value * 100.0 },
            stressed_return,
        });
    }

    let summary = StressSummary {
        max_loss: scenarios.iter().map(|s| s.loss).fold(0.0, f64::max),
        max_loss_percentage: scenarios.iter().map(|s| s.loss_percentage).fold(0.0, f64::max),
        num_scenarios: scenarios.len(),
    };

    Ok(StressReport {
        baseline_return,
        baseline_value,
        scenarios,
        skipped,
        summary,
    })
}
