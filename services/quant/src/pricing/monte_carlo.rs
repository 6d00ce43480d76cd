//! Seeded Monte Carlo pricing under geometric Brownian motion

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{OptionParams, OptionType};
use crate::error::{invalid, QuantResult};
use crate::stats::{mean, std_dev};

pub const DEFAULT_SIMULATIONS: usize = 100_000;
pub const DEFAULT_SEED: u64 = 42;
pub const MAX_SIMULATIONS: usize = 1_000_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloValuation {
    pub model: &'static str,
    pub option_price: f64,
    pub standard_error: f64,
    pub confidence_interval_95: [f64; 2],
    pub delta: f64,
    pub num_simulations: usize,
    pub seed: u64,
    pub parameters: OptionParams,
}

/// Draws standard normals in pairs (Box-Muller)
pub(crate) struct NormalSampler {
    rng: ChaCha8Rng,
    spare: Option<f64>,
}

impl NormalSampler {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            spare: None,
        }
    }

    pub(crate) fn next(&mut self) -> f64 {
        if let Some(z) = self.spare.take() {
            return z;
        }
        // u1 in (0, 1] so ln never sees zero
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen();
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = 2.0 * std::f64::consts::PI * u2;
        self.spare = Some(radius * angle.sin());
        radius * angle.cos()
    }
}

fn terminal_payoffs(params: &OptionParams, spot: f64, shocks: &[f64]) -> Vec<f64> {
    let t = params.time_to_maturity;
    let drift = (params.risk_free_rate - params.dividend_yield - 0.5 * params.volatility.powi(2)) * t;
    let diffusion = params.volatility * t.sqrt();
    shocks
        .iter()
        .map(|z| {
            let terminal = spot * (drift + diffusion * z).exp();
            match params.option_type {
                OptionType::Call => (terminal - params.strike_price).max(0.0),
                OptionType::Put => (params.strike_price - terminal).max(0.0),
            }
        })
        .collect()
}

/// Price a European option; delta by central difference on common random
/// numbers with a 1% spot bump.
pub fn price(params: &OptionParams, simulations: usize, seed: u64) -> QuantResult<MonteCarloValuation> {
    params.validate()?;
    if !(1_000..=MAX_SIMULATIONS).contains(&simulations) {
        return Err(invalid(
            "num_simulations",
            format!("must be between 1000 and {MAX_SIMULATIONS}, got {simulations}"),
        ));
    }

    let mut sampler = NormalSampler::new(seed);
    let shocks: Vec<f64> = (0..simulations).map(|_| sampler.next()).collect();
    let discount = (-params.risk_free_rate * params.time_to_maturity).exp();

    let payoffs = terminal_payoffs(params, params.spot_price, &shocks);
    let option_price = discount * mean(&payoffs);
    let standard_error = discount * std_dev(&payoffs) / (simulations as f64).sqrt();

    let bump = params.spot_price * 0.01;
    let up = discount * mean(&terminal_payoffs(params, params.spot_price + bump, &shocks));
    let down = discount * mean(&terminal_payoffs(params, params.spot_price - bump, &shocks));

    Ok(MonteCarloValuation {
        model: "monte_carlo",
        option_price,
        standard_error,
        confidence_interval_95: [
            option_price - 1.96 * standard_error,
            option_price + 1.96 * standard_error,
        ],
        delta: (up - down) / (2.0 * bump),
        num_simulations: simulations,
        seed,
        parameters: *params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{black_scholes, sample};

    #[test]
    fn test_agrees_with_black_scholes() {
        for kind in [OptionType::Call, OptionType::Put] {
            let p = sample(kind);
            let mc = price(&p, 200_000, DEFAULT_SEED).unwrap();
            let closed = black_scholes::price(&p).unwrap();
            assert!(
                (mc.option_price - closed).abs() < 4.0 * mc.standard_error,
                "{kind:?}: {} vs {closed}",
                mc.option_price
            );
            let bs_delta = black_scholes::greeks(&p).unwrap().delta;
            assert!((mc.delta - bs_delta).abs() < 0.02);
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let p = sample(OptionType::Call);
        let a = price(&p, 5_000, 7).unwrap();
        let b = price(&p, 5_000, 7).unwrap();
        let c = price(&p, 5_000, 8).unwrap();
        assert_eq!(a.option_price, b.option_price);
        assert_ne!(a.option_price, c.option_price);
    }

    #[test]
    fn test_normal_sampler_moments() {
        let mut sampler = NormalSampler::new(1);
        let draws: Vec<f64> = (0..50_000).map(|_| sampler.next()).collect();
        assert!(mean(&draws).abs() < 0.02);
        assert!((std_dev(&draws) - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_simulation_bounds() {
        assert!(price(&sample(OptionType::Call), 10, DEFAULT_SEED).is_err());
    }
}
