//! Option and bond pricing models

pub mod black_scholes;
pub mod binomial;
pub mod monte_carlo;
pub mod bond;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, QuantResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn payoff(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// Inputs shared by every option model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionParams {
    pub spot_price: f64,
    pub strike_price: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,
    /// Years
    pub time_to_maturity: f64,
    #[serde(default)]
    pub dividend_yield: f64,
    pub option_type: OptionType,
}

impl OptionParams {
    pub fn validate(&self) -> QuantResult<()> {
        ensure_positive("spot_price", self.spot_price)?;
        ensure_positive("strike_price", self.strike_price)?;
        ensure_non_negative("risk_free_rate", self.risk_free_rate)?;
        ensure_positive("volatility", self.volatility)?;
        ensure_positive("time_to_maturity", self.time_to_maturity)?;
        ensure_non_negative("dividend_yield", self.dividend_yield)
    }

    pub(crate) fn with_volatility(self, volatility: f64) -> Self {
        Self { volatility, ..self }
    }

    pub(crate) fn with_rate(self, risk_free_rate: f64) -> Self {
        Self {
            risk_free_rate,
            ..self
        }
    }

    pub(crate) fn with_spot(self, spot_price: f64) -> Self {
        Self { spot_price, ..self }
    }
}

/// Sensitivities. Theta is per year, vega per 1.00 of volatility and rho
/// per 1.00 of rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionValuation {
    pub model: &'static str,
    pub option_price: f64,
    pub greeks: Greeks,
    pub parameters: OptionParams,
}

#[cfg(test)]
pub(crate) fn sample(option_type: OptionType) -> OptionParams {
    OptionParams {
        spot_price: 100.0,
        strike_price: 100.0,
        risk_free_rate: 0.05,
        volatility: 0.2,
        time_to_maturity: 1.0,
        dividend_yield: 0.0,
        option_type,
    }
}
