//! Quant request bodies
//!
//! Model inputs are the `quant` crate's own parameter types, flattened
//! into each body so the wire format stays flat. The checks here are the
//! API's accepted ranges; the models re-check their mathematical domain.

use quant::analytics::market::MarketRequest;
use quant::analytics::volatility_surface::Surface;
use quant::analytics::yield_curve::{BootstrapRequest, CurveRequest, ForwardRequest};
use quant::pricing::bond::BondParams;
use quant::pricing::monte_carlo::{DEFAULT_SEED, DEFAULT_SIMULATIONS, MAX_SIMULATIONS};
use quant::pricing::{OptionParams, OptionType};
use quant::risk::portfolio::PortfolioRequest;
use quant::risk::stress::StressRequest;
use quant::risk::var::{PortfolioVarRequest, VarRequest};
use serde::{Deserialize, Serialize};

use crate::validation::{Validate, ValidationResult, in_range, non_negative_f64, positive_f64};

pub const MIN_STEPS: usize = 10;
pub const MAX_STEPS: usize = 1000;
pub const MIN_SIMULATIONS: usize = 1000;
/// Longest accepted return or price series
pub const MAX_SERIES_LEN: usize = 100_000;

fn option_ranges(p: &OptionParams) -> ValidationResult {
    positive_f64("spot_price", p.spot_price)?;
    positive_f64("strike_price", p.strike_price)?;
    non_negative_f64("risk_free_rate", p.risk_free_rate)?;
    positive_f64("volatility", p.volatility)?;
    positive_f64("time_to_maturity", p.time_to_maturity)?;
    non_negative_f64("dividend_yield", p.dividend_yield)
}

fn series_len(field: &str, len: usize) -> ValidationResult {
    if len > MAX_SERIES_LEN {
        Err(format!("{field} must contain at most {MAX_SERIES_LEN} points"))
    } else {
        Ok(())
    }
}

fn matrix_len(field: &str, rows: &[Vec<f64>]) -> ValidationResult {
    series_len(field, rows.iter().map(Vec::len).sum())
}

fn risk_ranges(confidence_level: f64, time_horizon: u32, portfolio_value: f64) -> ValidationResult {
    in_range("confidence_level", confidence_level, 0.01, 0.5)?;
    if time_horizon < 1 {
        return Err("time_horizon must be at least 1".to_string());
    }
    positive_f64("portfolio_value", portfolio_value)
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionRequest {
    #[serde(flatten)]
    pub params: OptionParams,
}

impl Validate for OptionRequest {
    fn validate(&self) -> ValidationResult {
        option_ranges(&self.params)
    }
}

/// Query-string form of the option inputs
#[derive(Debug, Clone, Deserialize)]
pub struct GreeksQuery {
    pub spot_price: f64,
    pub strike_price: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    pub time_to_maturity: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub option_type: OptionType,
}

impl GreeksQuery {
    pub fn params(&self) -> OptionParams {
        OptionParams {
            spot_price: self.spot_price,
            strike_price: self.strike_price,
            risk_free_rate: self.risk_free_rate,
            volatility: self.volatility,
            time_to_maturity: self.time_to_maturity,
            dividend_yield: self.dividend_yield,
            option_type: self.option_type,
        }
    }
}

impl Validate for GreeksQuery {
    fn validate(&self) -> ValidationResult {
        option_ranges(&self.params())
    }
}

fn default_steps() -> usize {
    100
}

/// Binomial and American pricing
#[derive(Debug, Clone, Deserialize)]
pub struct TreeRequest {
    #[serde(flatten)]
    pub params: OptionParams,
    #[serde(default = "default_steps")]
    pub steps: usize,
}

impl Validate for TreeRequest {
    fn validate(&self) -> ValidationResult {
        option_ranges(&self.params)?;
        in_range("steps", self.steps, MIN_STEPS, MAX_STEPS)
    }
}

fn default_simulations() -> usize {
    DEFAULT_SIMULATIONS
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonteCarloRequest {
    #[serde(flatten)]
    pub params: OptionParams,
    #[serde(default = "default_simulations")]
    pub num_simulations: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Validate for MonteCarloRequest {
    fn validate(&self) -> ValidationResult {
        option_ranges(&self.params)?;
        in_range("num_simulations", self.num_simulations, MIN_SIMULATIONS, MAX_SIMULATIONS)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImpliedVolatilityRequest {
    pub spot_price: f64,
    pub strike_price: f64,
    pub risk_free_rate: f64,
    pub time_to_maturity: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub option_type: OptionType,
    pub market_price: f64,
}

impl ImpliedVolatilityRequest {
    /// Volatility is a placeholder; the solver picks its own start
    pub fn params(&self) -> OptionParams {
        OptionParams {
            spot_price: self.spot_price,
            strike_price: self.strike_price,
            risk_free_rate: self.risk_free_rate,
            volatility: 0.2,
            time_to_maturity: self.time_to_maturity,
            dividend_yield: self.dividend_yield,
            option_type: self.option_type,
        }
    }
}

impl Validate for ImpliedVolatilityRequest {
    fn validate(&self) -> ValidationResult {
        option_ranges(&self.params())?;
        positive_f64("market_price", self.market_price)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpliedVolatility {
    pub implied_volatility: f64,
    pub market_price: f64,
    pub parameters: OptionParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BondRequest {
    #[serde(flatten)]
    pub params: BondParams,
}

impl Validate for BondRequest {
    fn validate(&self) -> ValidationResult {
        positive_f64("face_value", self.params.face_value)?;
        non_negative_f64("coupon_rate", self.params.coupon_rate)?;
        positive_f64("maturity", self.params.maturity)
    }
}

fn default_frequency() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct BondYieldRequest {
    pub face_value: f64,
    pub coupon_rate: f64,
    pub maturity: f64,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
    pub market_price: f64,
}

impl BondYieldRequest {
    pub fn params(&self) -> BondParams {
        BondParams {
            face_value: self.face_value,
            coupon_rate: self.coupon_rate,
            maturity: self.maturity,
            yield_rate: 0.0,
            frequency: self.frequency,
        }
    }
}

impl Validate for BondYieldRequest {
    fn validate(&self) -> ValidationResult {
        positive_f64("face_value", self.face_value)?;
        non_negative_f64("coupon_rate", self.coupon_rate)?;
        positive_f64("maturity", self.maturity)?;
        positive_f64("market_price", self.market_price)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BondYield {
    pub yield_to_maturity: f64,
    pub market_price: f64,
    pub parameters: BondParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VarBody {
    #[serde(flatten)]
    pub request: VarRequest,
}

impl Validate for VarBody {
    fn validate(&self) -> ValidationResult {
        let r = &self.request;
        series_len("returns", r.returns.len())?;
        risk_ranges(r.confidence_level, r.time_horizon, r.portfolio_value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioVarBody {
    #[serde(flatten)]
    pub request: PortfolioVarRequest,
}

impl Validate for PortfolioVarBody {
    fn validate(&self) -> ValidationResult {
        let r = &self.request;
        matrix_len("returns", &r.returns)?;
        risk_ranges(r.confidence_level, r.time_horizon, r.portfolio_value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioBody {
    #[serde(flatten)]
    pub request: PortfolioRequest,
}

impl Validate for PortfolioBody {
    fn validate(&self) -> ValidationResult {
        matrix_len("returns", &self.request.returns)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StressBody {
    #[serde(flatten)]
    pub request: StressRequest,
}

impl Validate for StressBody {
    fn validate(&self) -> ValidationResult {
        matrix_len("returns", &self.request.returns)?;
        if self.request.scenarios.is_empty() {
            return Err("scenarios must not be empty".to_string());
        }
        positive_f64("portfolio_value", self.request.portfolio_value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurveBody {
    #[serde(flatten)]
    pub request: CurveRequest,
}

impl Validate for CurveBody {
    fn validate(&self) -> ValidationResult {
        series_len("maturities", self.request.maturities.len())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardBody {
    #[serde(flatten)]
    pub request: ForwardRequest,
}

impl Validate for ForwardBody {
    fn validate(&self) -> ValidationResult {
        series_len("maturities", self.request.maturities.len())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapBody {
    #[serde(flatten)]
    pub request: BootstrapRequest,
}

impl Validate for BootstrapBody {
    fn validate(&self) -> ValidationResult {
        series_len("maturities", self.request.maturities.len())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceBody {
    #[serde(flatten)]
    pub surface: Surface,
}

impl Validate for SurfaceBody {
    fn validate(&self) -> ValidationResult {
        matrix_len("volatilities", &self.surface.volatilities)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurfaceInterpolationRequest {
    #[serde(flatten)]
    pub surface: Surface,
    pub strike: f64,
    pub maturity: f64,
}

impl Validate for SurfaceInterpolationRequest {
    fn validate(&self) -> ValidationResult {
        matrix_len("volatilities", &self.surface.volatilities)?;
        positive_f64("strike", self.strike)?;
        positive_f64("maturity", self.maturity)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InterpolatedVolatility {
    pub strike: f64,
    pub maturity: f64,
    pub volatility: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketBody {
    #[serde(flatten)]
    pub request: MarketRequest,
}

impl Validate for MarketBody {
    fn validate(&self) -> ValidationResult {
        series_len("prices", self.request.prices.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option_json() -> serde_json::Value {
        serde_json::json!({
            "spot_price": 100.0,
            "strike_price": 105.0,
            "risk_free_rate": 0.05,
            "volatility": 0.2,
            "time_to_maturity": 0.5,
            "option_type": "call"
        })
    }

    #[test]
    fn test_tree_steps_default_and_bounds() {
        let req: TreeRequest = serde_json::from_value(option_json()).unwrap();
        assert_eq!(req.steps, 100);
        assert!(req.validate().is_ok());

        let mut body = option_json();
        body["steps"] = 5.into();
        let req: TreeRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.validate().unwrap_err(), "steps must be between 10 and 1000");
    }

    #[test]
    fn test_monte_carlo_defaults() {
        let req: MonteCarloRequest = serde_json::from_value(option_json()).unwrap();
        assert_eq!(req.seed, 42);
        assert_eq!(req.num_simulations, DEFAULT_SIMULATIONS);

        let mut body = option_json();
        body["num_simulations"] = 500.into();
        let req: MonteCarloRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_option_ranges() {
        let mut body = option_json();
        body["volatility"] = 0.0.into();
        let req: OptionRequest = serde_json::from_value(body).unwrap();
        assert_eq!(req.validate().unwrap_err(), "volatility must be a positive number");
    }

    #[test]
    fn test_var_confidence_range() {
        let req: VarBody = serde_json::from_value(serde_json::json!({
            "returns": [0.01, -0.02, 0.015, -0.005],
            "confidence_level": 0.9
        }))
        .unwrap();
        assert!(req.validate().unwrap_err().starts_with("confidence_level"));

        let req: VarBody = serde_json::from_value(serde_json::json!({
            "returns": [0.01, -0.02, 0.015, -0.005],
            "method": "parametric",
            "time_horizon": 10
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }
}
