//! One-dimensional interpolators over strictly increasing knots
//!
//! Every method extrapolates flat outside the knot range.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Linear,
    /// Natural cubic spline
    #[serde(alias = "spline")]
    Cubic,
    /// Fritsch-Carlson monotone cubic
    Monotone,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Linear => "linear",
            Method::Cubic => "cubic",
            Method::Monotone => "monotone",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Method::Linear => "Piecewise linear between observed maturities",
            Method::Cubic => "Natural cubic spline (zero curvature at both ends)",
            Method::Monotone => "Fritsch-Carlson monotone cubic; no overshoot between knots",
        }
    }

    pub const ALL: [Method; 3] = [Method::Linear, Method::Cubic, Method::Monotone];
}

#[derive(Debug, Clone)]
pub struct Interpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Linear,
    /// Second derivatives at the knots
    Spline(Vec<f64>),
    /// First derivatives at the knots
    Hermite(Vec<f64>),
}

impl Interpolator {
    /// Callers validate that `xs` is strictly increasing and the lengths match
    pub fn new(method: Method, xs: &[f64], ys: &[f64]) -> Self {
        let kind = if xs.len() < 3 {
            Kind::Linear
        } else {
            match method {
                Method::Linear => Kind::Linear,
                Method::Cubic => Kind::Spline(natural_second_derivatives(xs, ys)),
                Method::Monotone => Kind::Hermite(fritsch_carlson_slopes(xs, ys)),
            }
        };
        Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            kind,
        }
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        match n {
            0 => return 0.0,
            1 => return self.ys[0],
            _ => {}
        }
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        // first knot strictly greater than x
        let hi = self.xs.partition_point(|k| *k <= x);
        let lo = hi - 1;
        let (x0, x1, y0, y1) = (self.xs[lo], self.xs[hi], self.ys[lo], self.ys[hi]);
        let h = x1 - x0;

        match &self.kind {
            Kind::Linear => y0 + (y1 - y0) * (x - x0) / h,
            Kind::Spline(m) => {
                let a = (x1 - x) / h;
                let b = (x - x0) / h;
                a * y0 + b * y1 + ((a.powi(3) - a) * m[lo] + (b.powi(3) - b) * m[hi]) * h * h / 6.0
            }
            Kind::Hermite(d) => {
                let t = (x - x0) / h;
                let (t2, t3) = (t * t, t * t * t);
                (2.0 * t3 - 3.0 * t2 + 1.0) * y0
                    + (t3 - 2.0 * t2 + t) * h * d[lo]
                    + (-2.0 * t3 + 3.0 * t2) * y1
                    + (t3 - t2) * h * d[hi]
            }
        }
    }
}

/// Tridiagonal solve with zero curvature at both ends
fn natural_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    let mut c_prime = vec![0.0; n];
    let mut d_prime = vec![0.0; n];

    for i in 1..n - 1 {
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        let rhs = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
        let diag = 2.0 * (h0 + h1) - h0 * c_prime[i - 1];
        c_prime[i] = h1 / diag;
        d_prime[i] = (rhs - h0 * d_prime[i - 1]) / diag;
    }
    for i in (1..n - 1).rev() {
        m[i] = d_prime[i] - c_prime[i] * m[i + 1];
    }
    m
}

fn fritsch_carlson_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let secants: Vec<f64> = (0..n - 1)
        .map(|i| (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]))
        .collect();

    let mut d = vec![0.0; n];
    d[0] = secants[0];
    d[n - 1] = secants[n - 2];
    for i in 1..n - 1 {
        d[i] = if secants[i - 1] * secants[i] <= 0.0 {
            0.0
        } else {
            0.5 * (secants[i - 1] + secants[i])
        };
    }

    for i in 0..n - 1 {
        if secants[i] == 0.0 {
            d[i] = 0.0;
            d[i + 1] = 0.0;
            continue;
        }
        let alpha = d[i] / secants[i];
        let beta = d[i + 1] / secants[i];
        let norm = alpha * alpha + beta * beta;
        if norm > 9.0 {
            let tau = 3.0 / norm.sqrt();
            d[i] = tau * alpha * secants[i];
            d[i + 1] = tau * beta * secants[i];
        }
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;

    const XS: [f64; 5] = [0.5, 1.0, 2.0, 5.0, 10.0];
    const YS: [f64; 5] = [0.02, 0.025, 0.03, 0.035, 0.04];

    #[test]
    fn test_all_methods_hit_knots() {
        for method in Method::ALL {
            let f = Interpolator::new(method, &XS, &YS);
            for (x, y) in XS.iter().zip(YS) {
                assert!((f.eval(*x) - y).abs() < 1e-12, "{method:?} at {x}");
            }
        }
    }

    #[test]
    fn test_flat_extrapolation() {
        for method in Method::ALL {
            let f = Interpolator::new(method, &XS, &YS);
            assert_eq!(f.eval(0.1), 0.02);
            assert_eq!(f.eval(30.0), 0.04);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let f = Interpolator::new(Method::Linear, &XS, &YS);
        assert!((f.eval(3.5) - 0.0325).abs() < 1e-12);
    }

    #[test]
    fn test_spline_reproduces_a_line() {
        let ys: Vec<f64> = XS.iter().map(|x| 0.01 + 0.002 * x).collect();
        let f = Interpolator::new(Method::Cubic, &XS, &ys);
        assert!((f.eval(7.3) - (0.01 + 0.002 * 7.3)).abs() < 1e-12);
    }

    #[test]
    fn test_monotone_does_not_overshoot() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 0.0, 1.0, 1.0];
        let f = Interpolator::new(Method::Monotone, &xs, &ys);
        let mut prev = f.eval(0.0);
        for i in 1..=300 {
            let y = f.eval(i as f64 * 0.01);
            assert!(y >= prev - 1e-12);
            assert!((0.0..=1.0).contains(&y));
            prev = y;
        }
    }

    #[test]
    fn test_spline_alias() {
        let m: Method = serde_json::from_str("\"spline\"").unwrap();
        assert_eq!(m, Method::Cubic);
    }
}
