//! Cox-Ross-Rubinstein lattice for European and American exercise

use super::{Greeks, OptionParams, OptionValuation};
use crate::error::{invalid, QuantResult};

pub const MIN_STEPS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exercise {
    European,
    American,
}

struct Lattice {
    dt: f64,
    u: f64,
    d: f64,
    p: f64,
    discount: f64,
}

impl Lattice {
    fn build(params: &OptionParams, steps: usize) -> QuantResult<Self> {
        params.validate()?;
        if steps < MIN_STEPS {
            return Err(invalid("steps", format!("need at least {MIN_STEPS}, got {steps}")));
        }
        let dt = params.time_to_maturity / steps as f64;
        let u = (params.volatility * dt.sqrt()).exp();
        let d = 1.0 / u;
        let p = (((params.risk_free_rate - params.dividend_yield) * dt).exp() - d) / (u - d);
        if !(p > 0.0 && p < 1.0) {
            return Err(invalid(
                "steps",
                format!("risk-neutral probability {p:.4} outside (0, 1); increase steps"),
            ));
        }
        Ok(Self {
            dt,
            u,
            d,
            p,
            discount: (-params.risk_free_rate * dt).exp(),
        })
    }

    fn spot_at(&self, spot: f64, step: usize, ups: usize) -> f64 {
        spot * self.u.powi(ups as i32) * self.d.powi((step - ups) as i32)
    }
}

/// Node values at steps 0, 1 and 2 from a backward induction
struct Induction {
    root: f64,
    level1: [f64; 2],
    level2: [f64; 3],
}

fn induct(params: &OptionParams, steps: usize, exercise: Exercise) -> QuantResult<(Lattice, Induction)> {
    let lattice = Lattice::build(params, steps)?;
    let spot = params.spot_price;
    let strike = params.strike_price;
    let kind = params.option_type;

    let mut values: Vec<f64> = (0..=steps)
        .map(|j| kind.payoff(lattice.spot_at(spot, steps, j), strike))
        .collect();
    let mut level1 = [0.0; 2];
    let mut level2 = [0.0; 3];

    for step in (0..steps).rev() {
        for j in 0..=step {
            let continuation =
                lattice.discount * (lattice.p * values[j + 1] + (1.0 - lattice.p) * values[j]);
            values[j] = match exercise {
                Exercise::European => continuation,
                Exercise::American => {
                    continuation.max(kind.payoff(lattice.spot_at(spot, step, j), strike))
                }
            };
        }
        match step {
            2 => level2.copy_from_slice(&values[..3]),
            1 => level1.copy_from_slice(&values[..2]),
            _ => {}
        }
    }

    Ok((
        lattice,
        Induction {
            root: values[0],
            level1,
            level2,
        },
    ))
}

pub fn price(params: &OptionParams, steps: usize, exercise: Exercise) -> QuantResult<f64> {
    Ok(induct(params, steps, exercise)?.1.root)
}

/// Greeks read off the first two lattice levels; vega and rho by central
/// bumps of 0.01.
pub fn greeks(params: &OptionParams, steps: usize, exercise: Exercise) -> QuantResult<Greeks> {
    let (lattice, nodes) = induct(params, steps, exercise)?;
    let s = params.spot_price;
    let (s_u, s_d) = (s * lattice.u, s * lattice.d);
    let (s_uu, s_ud, s_dd) = (s_u * lattice.u, s, s_d * lattice.d);

    let delta = (nodes.level1[1] - nodes.level1[0]) / (s_u - s_d);
    let delta_up = (nodes.level2[2] - nodes.level2[1]) / (s_uu - s_ud);
    let delta_down = (nodes.level2[1] - nodes.level2[0]) / (s_ud - s_dd);
    let gamma = (delta_up - delta_down) / (0.5 * (s_uu - s_dd));
    let theta = (nodes.level2[1] - nodes.root) / (2.0 * lattice.dt);

    const BUMP: f64 = 0.01;
    let vol_up = price(&params.with_volatility(params.volatility + BUMP), steps, exercise)?;
    let vol_down = price(&params.with_volatility((params.volatility - BUMP).max(1e-4)), steps, exercise)?;
    let vol_span = params.volatility + BUMP - (params.volatility - BUMP).max(1e-4);
    let rate_up = price(&params.with_rate(params.risk_free_rate + BUMP), steps, exercise)?;
    let rate_low = (params.risk_free_rate - BUMP).max(0.0);
    let rate_down = price(&params.with_rate(rate_low), steps, exercise)?;

    Ok(Greeks {
        delta,
        gamma,
        theta,
        vega: (vol_up - vol_down) / vol_span,
        rho: (rate_up - rate_down) / (params.risk_free_rate + BUMP - rate_low),
    })
}

pub fn valuation(params: &OptionParams, steps: usize, exercise: Exercise) -> QuantResult<OptionValuation> {
    let model = match exercise {
        Exercise::European => "binomial_european",
        Exercise::American => "binomial_american",
    };
    Ok(OptionValuation {
        model,
        option_price: price(params, steps, exercise)?,
        greeks: greeks(params, steps, exercise)?,
        parameters: *params,
    })
}

/// Premium an American holder pays for the early exercise right
pub fn early_exercise_premium(params: &OptionParams, steps: usize) -> QuantResult<f64> {
    let american = price(params, steps, Exercise::American)?;
    let european = price(params, steps, Exercise::European)?;
    Ok((american - european).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{black_scholes, sample, OptionType};

    #[test]
    fn test_european_converges_to_black_scholes() {
        for kind in [OptionType::Call, OptionType::Put] {
            let p = sample(kind);
            let tree = price(&p, 500, Exercise::European).unwrap();
            let closed = black_scholes::price(&p).unwrap();
            assert!((tree - closed).abs() < 0.02, "{kind:?}: {tree} vs {closed}");
        }
    }

    #[test]
    fn test_american_put_dominates_european() {
        let mut p = sample(OptionType::Put);
        p.risk_free_rate = 0.08;
        p.strike_price = 110.0;
        let american = price(&p, 200, Exercise::American).unwrap();
        let european = price(&p, 200, Exercise::European).unwrap();
        assert!(american > european);
        assert!(early_exercise_premium(&p, 200).unwrap() > 0.0);
        assert!(american >= p.strike_price - p.spot_price);
    }

    #[test]
    fn test_american_call_without_dividend_matches_european() {
        let p = sample(OptionType::Call);
        let american = price(&p, 200, Exercise::American).unwrap();
        let european = price(&p, 200, Exercise::European).unwrap();
        assert!((american - european).abs() < 1e-9);
    }

    #[test]
    fn test_tree_greeks_close_to_closed_form() {
        let p = sample(OptionType::Call);
        let tree = greeks(&p, 400, Exercise::European).unwrap();
        let closed = black_scholes::greeks(&p).unwrap();
        assert!((tree.delta - closed.delta).abs() < 0.01);
        assert!((tree.gamma - closed.gamma).abs() < 0.005);
        assert!((tree.theta - closed.theta).abs() < 0.1);
        assert!((tree.vega - closed.vega).abs() < 0.5);
        assert!((tree.rho - closed.rho).abs() < 0.5);
    }

    #[test]
    fn test_too_few_steps() {
        assert!(price(&sample(OptionType::Call), 2, Exercise::European).is_err());
    }

    #[test]
    fn test_unstable_probability_rejected() {
        let mut p = sample(OptionType::Call);
        p.risk_free_rate = 0.9;
        p.volatility = 0.01;
        assert!(price(&p, 3, Exercise::European).is_err());
    }
}
