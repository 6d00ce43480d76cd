//! Fixed-coupon bond pricing, duration and convexity

use serde::{Deserialize, Serialize};

use crate::error::{ensure_non_negative, ensure_positive, invalid, QuantError, QuantResult};

pub const FREQUENCIES: [u32; 4] = [1, 2, 4, 12];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondParams {
    pub face_value: f64,
    /// Annual coupon rate
    pub coupon_rate: f64,
    /// Years
    pub maturity: f64,
    /// Annual yield to maturity
    pub yield_rate: f64,
    #[serde(default = "default_frequency")]
    pub frequency: u32,
}

fn default_frequency() -> u32 {
    2
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BondValuation {
    pub bond_price: f64,
    pub macaulay_duration: f64,
    pub modified_duration: f64,
    pub convexity: f64,
    pub current_yield: f64,
    pub periods: u32,
    pub parameters: BondParams,
}

impl BondParams {
    pub fn validate(&self) -> QuantResult<()> {
        ensure_positive("face_value", self.face_value)?;
        ensure_non_negative("coupon_rate", self.coupon_rate)?;
        ensure_positive("maturity", self.maturity)?;
        if !self.yield_rate.is_finite() || self.yield_rate <= -1.0 {
            return Err(invalid("yield_rate", "must be greater than -1"));
        }
        if !FREQUENCIES.contains(&self.frequency) {
            return Err(invalid("frequency", format!("must be one of {FREQUENCIES:?}")));
        }
        if self.periods() == 0 {
            return Err(invalid("maturity", "shorter than one coupon period"));
        }
        Ok(())
    }

    pub fn periods(&self) -> u32 {
        (self.maturity * self.frequency as f64).round() as u32
    }

    fn cash_flows(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let f = self.frequency as f64;
        let n = self.periods();
        let coupon = self.face_value * self.coupon_rate / f;
        (1..=n).map(move |k| {
            let flow = if k == n { coupon + self.face_value } else { coupon };
            (k as f64 / f, flow)
        })
    }

    fn discount(&self, t: f64) -> f64 {
        let f = self.frequency as f64;
        (1.0 + self.yield_rate / f).powf(-f * t)
    }
}

fn raw_price(params: &BondParams) -> f64 {
    params.cash_flows().map(|(t, cf)| cf * params.discount(t)).sum()
}

pub fn price(params: &BondParams) -> QuantResult<f64> {
    params.validate()?;
    Ok(raw_price(params))
}

pub fn valuation(params: &BondParams) -> QuantResult<BondValuation> {
    params.validate()?;
    let f = params.frequency as f64;
    let bond_price = raw_price(params);
    let mut weighted_time = 0.0;
    let mut weighted_convexity = 0.0;
    for (t, cf) in params.cash_flows() {
        let pv = cf * params.discount(t);
        weighted_time += pv * t;
        weighted_convexity += pv * t * (t + 1.0 / f);
    }
    let macaulay = weighted_time / bond_price;
    let growth = 1.0 + params.yield_rate / f;

    Ok(BondValuation {
        bond_price,
        macaulay_duration: macaulay,
        modified_duration: macaulay / growth,
        convexity: weighted_convexity / (bond_price * growth * growth),
        current_yield: params.face_value * params.coupon_rate / bond_price,
        periods: params.periods(),
        parameters: *params,
    })
}

/// Yield to maturity that reproduces `market_price`, by bisection
pub fn yield_from_price(params: &BondParams, market_price: f64) -> QuantResult<f64> {
    ensure_positive("market_price", market_price)?;
    let mut trial = BondParams {
        yield_rate: 0.0,
        ..*params
    };
    trial.validate()?;

    let price_at = |y: f64, trial: &mut BondParams| {
        trial.yield_rate = y;
        raw_price(trial)
    };
    // price falls as yield rises
    let mut lo: f64 = -0.99;
    let mut hi = 1.0;
    if price_at(hi, &mut trial) > market_price {
        hi = 10.0;
    }
    if price_at(lo, &mut trial) < market_price || price_at(hi, &mut trial) > market_price {
        return Err(invalid("market_price", "no yield in (-99%, 1000%) reproduces this price"));
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        let diff = price_at(mid, &mut trial) - market_price;
        if diff.abs() < 1e-10 || hi - lo < 1e-14 {
            return Ok(mid);
        }
        if diff > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Err(QuantError::NoConvergence("bond yield"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bond(coupon_rate: f64, yield_rate: f64) -> BondParams {
        BondParams {
            face_value: 1000.0,
            coupon_rate,
            maturity: 10.0,
            yield_rate,
            frequency: 2,
        }
    }

    #[test]
    fn test_par_bond_prices_at_face() {
        let v = valuation(&bond(0.05, 0.05)).unwrap();
        assert!((v.bond_price - 1000.0).abs() < 1e-8);
        assert!((v.current_yield - 0.05).abs() < 1e-10);
    }

    #[test]
    fn test_zero_coupon_duration_equals_maturity() {
        let v = valuation(&bond(0.0, 0.04)).unwrap();
        assert!((v.macaulay_duration - 10.0).abs() < 1e-10);
        assert!((v.modified_duration - 10.0 / 1.02).abs() < 1e-10);
    }

    #[test]
    fn test_duration_convexity_approximation() {
        let base = bond(0.06, 0.05);
        let v = valuation(&base).unwrap();
        let dy = 0.0001;
        let up = price(&BondParams { yield_rate: 0.05 + dy, ..base }).unwrap();
        let down = price(&BondParams { yield_rate: 0.05 - dy, ..base }).unwrap();
        let fd_duration = -(up - down) / (2.0 * dy * v.bond_price);
        let fd_convexity = (up + down - 2.0 * v.bond_price) / (dy * dy * v.bond_price);
        assert!((fd_duration - v.modified_duration).abs() < 1e-4);
        assert!((fd_convexity - v.convexity).abs() / v.convexity < 1e-3);
    }

    #[test]
    fn test_yield_round_trip() {
        let base = bond(0.045, 0.0625);
        let market = price(&base).unwrap();
        let y = yield_from_price(&base, market).unwrap();
        assert!((y - 0.0625).abs() < 1e-8);
    }

    #[test]
    fn test_frequency_validation() {
        let mut b = bond(0.05, 0.05);
        b.frequency = 3;
        assert!(price(&b).is_err());
    }
}
