//! Closed-form Black-Scholes-Merton pricing and implied volatility

use tracing::debug;

use super::{Greeks, OptionParams, OptionType, OptionValuation};
use crate::error::{ensure_positive, invalid, QuantError, QuantResult};
use crate::stats::{norm_cdf, norm_pdf};

fn d1_d2(p: &OptionParams) -> (f64, f64) {
    let sqrt_t = p.time_to_maturity.sqrt();
    let d1 = ((p.spot_price / p.strike_price).ln()
        + (p.risk_free_rate - p.dividend_yield + 0.5 * p.volatility * p.volatility) * p.time_to_maturity)
        / (p.volatility * sqrt_t);
    (d1, d1 - p.volatility * sqrt_t)
}

/// Unvalidated price; callers check inputs
fn raw_price(p: &OptionParams) -> f64 {
    let (d1, d2) = d1_d2(p);
    let df_r = (-p.risk_free_rate * p.time_to_maturity).exp();
    let df_q = (-p.dividend_yield * p.time_to_maturity).exp();
    match p.option_type {
        OptionType::Call => p.spot_price * df_q * norm_cdf(d1) - p.strike_price * df_r * norm_cdf(d2),
        OptionType::Put => p.strike_price * df_r * norm_cdf(-d2) - p.spot_price * df_q * norm_cdf(-d1),
    }
}

pub fn price(p: &OptionParams) -> QuantResult<f64> {
    p.validate()?;
    Ok(raw_price(p))
}

fn raw_greeks(p: &OptionParams) -> Greeks {
    let (d1, d2) = d1_d2(p);
    let t = p.time_to_maturity;
    let sqrt_t = t.sqrt();
    let df_r = (-p.risk_free_rate * t).exp();
    let df_q = (-p.dividend_yield * t).exp();
    let pdf = norm_pdf(d1);

    let gamma = df_q * pdf / (p.spot_price * p.volatility * sqrt_t);
    let vega = p.spot_price * df_q * pdf * sqrt_t;
    let decay = -p.spot_price * df_q * pdf * p.volatility / (2.0 * sqrt_t);

    match p.option_type {
        OptionType::Call => Greeks {
            delta: df_q * norm_cdf(d1),
            gamma,
            theta: decay - p.risk_free_rate * p.strike_price * df_r * norm_cdf(d2)
                + p.dividend_yield * p.spot_price * df_q * norm_cdf(d1),
            vega,
            rho: p.strike_price * t * df_r * norm_cdf(d2),
        },
        OptionType::Put => Greeks {
            delta: df_q * (norm_cdf(d1) - 1.0),
            gamma,
            theta: decay + p.risk_free_rate * p.strike_price * df_r * norm_cdf(-d2)
                - p.dividend_yield * p.spot_price * df_q * norm_cdf(-d1),
            vega,
            rho: -p.strike_price * t * df_r * norm_cdf(-d2),
        },
    }
}

pub fn greeks(p: &OptionParams) -> QuantResult<Greeks> {
    p.validate()?;
    Ok(raw_greeks(p))
}

pub fn valuation(p: &OptionParams) -> QuantResult<OptionValuation> {
    p.validate()?;
    Ok(OptionValuation {
        model: "black_scholes",
        option_price: raw_price(p),
        greeks: raw_greeks(p),
        parameters: *p,
    })
}

const IV_LOW: f64 = 1e-6;
const IV_HIGH: f64 = 5.0;
const IV_TOLERANCE: f64 = 1e-8;

/// Volatility that reproduces `market_price`
///
/// Newton-Raphson from 20% vol, falling back to bisection on
/// [1e-6, 5.0] when vega vanishes or an iterate leaves the bracket.
/// `params.volatility` is ignored.
pub fn implied_volatility(params: &OptionParams, market_price: f64) -> QuantResult<f64> {
    ensure_positive("market_price", market_price)?;
    let p = params.with_volatility(0.2);
    p.validate()?;

    let t = p.time_to_maturity;
    let fwd_spot = p.spot_price * (-p.dividend_yield * t).exp();
    let pv_strike = p.strike_price * (-p.risk_free_rate * t).exp();
    let (lower, upper) = match p.option_type {
        OptionType::Call => ((fwd_spot - pv_strike).max(0.0), fwd_spot),
        OptionType::Put => ((pv_strike - fwd_spot).max(0.0), pv_strike),
    };
    if market_price <= lower || market_price >= upper {
        return Err(invalid(
            "market_price",
            format!("outside no-arbitrage bounds ({lower:.6}, {upper:.6})"),
        ));
    }

    let mut sigma = 0.2;
    for iteration in 0..100 {
        let trial = p.with_volatility(sigma);
        let diff = raw_price(&trial) - market_price;
        if diff.abs() < IV_TOLERANCE {
            debug!(iteration, sigma, "implied volatility converged (newton)");
            return Ok(sigma);
        }
        let vega = raw_greeks(&trial).vega;
        if vega < 1e-10 {
            break;
        }
        let next = sigma - diff / vega;
        if !(IV_LOW..=IV_HIGH).contains(&next) {
            break;
        }
        sigma = next;
    }

    let (mut lo, mut hi) = (IV_LOW, IV_HIGH);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let diff = raw_price(&p.with_volatility(mid)) - market_price;
        if diff.abs() < IV_TOLERANCE || (hi - lo) < 1e-12 {
            return Ok(mid);
        }
        if diff > 0.0 {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Err(QuantError::NoConvergence("implied volatility"))
}
