//! Descriptive statistics and the standard normal distribution

use serde::Serialize;

use crate::error::{invalid, QuantResult};

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (divides by n)
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    (xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64).sqrt()
}

/// Biased sample skewness
pub fn skewness(xs: &[f64]) -> f64 {
    let sd = std_dev(xs);
    if sd == 0.0 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| ((x - m) / sd).powi(3)).sum::<f64>() / xs.len() as f64
}

/// Excess kurtosis (normal = 0)
pub fn excess_kurtosis(xs: &[f64]) -> f64 {
    let sd = std_dev(xs);
    if sd == 0.0 {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| ((x - m) / sd).powi(4)).sum::<f64>() / xs.len() as f64 - 3.0
}

/// Percentile with linear interpolation between order statistics
///
/// `q` is a fraction in [0, 1].
pub fn percentile(xs: &[f64], q: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let mut sorted = xs.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation; 0 when either series is constant
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let (ma, mb) = (mean(a), mean(b));
    let cov: f64 = a.iter().zip(b).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    if va == 0.0 || vb == 0.0 {
        return 0.0;
    }
    cov / (va.sqrt() * vb.sqrt())
}

pub fn correlation_matrix(series: &[Vec<f64>]) -> Vec<Vec<f64>> {
    series
        .iter()
        .enumerate()
        .map(|(i, a)| {
            series
                .iter()
                .enumerate()
                .map(|(j, b)| if i == j { 1.0 } else { correlation(a, b) })
                .collect()
        })
        .collect()
}

/// Rows are assets, columns are observations. All rows must share a length.
pub fn check_matrix(field: &'static str, rows: &[Vec<f64>]) -> QuantResult<usize> {
    let Some(first) = rows.first() else {
        return Err(invalid(field, "must not be empty"));
    };
    let n = first.len();
    if n < 2 {
        return Err(invalid(field, "each series needs at least 2 observations"));
    }
    if rows.iter().any(|r| r.len() != n) {
        return Err(invalid(field, "all series must have the same length"));
    }
    Ok(n)
}

/// Weighted sum across assets for each observation
pub fn weighted_series(weights: &[f64], rows: &[Vec<f64>]) -> Vec<f64> {
    let n = rows.first().map_or(0, Vec::len);
    (0..n)
        .map(|t| weights.iter().zip(rows).map(|(w, r)| w * r[t]).sum())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub mean: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

pub fn summary(xs: &[f64]) -> Summary {
    Summary {
        mean: mean(xs),
        std_dev: std_dev(xs),
        skewness: skewness(xs),
        kurtosis: excess_kurtosis(xs),
    }
}

pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Standard normal CDF via the complementary error function
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// erfc with a Chebyshev fit, |error| < 1.2e-7
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Inverse standard normal CDF (rational approximation plus one Halley step)
pub fn norm_inv(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let x = if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    let e = norm_cdf(x) - p;
    let u = e * (2.0 * std::f64::consts::PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_moments() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&xs), 5.0);
        assert_eq!(std_dev(&xs), 2.0);
        assert!(skewness(&[1.0, 2.0, 3.0]).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates() {
        let xs = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_eq!(percentile(&xs, 0.0), 1.0);
        assert_eq!(percentile(&xs, 0.5), 3.0);
        assert_eq!(percentile(&xs, 1.0), 5.0);
        assert!(close(percentile(&xs, 0.1), 1.4, 1e-12));
    }

    #[test]
    fn test_normal_cdf_known_values() {
        assert!(close(norm_cdf(0.0), 0.5, 1e-7));
        assert!(close(norm_cdf(1.96), 0.975_002, 1e-6));
        assert!(close(norm_cdf(-1.644_853_6), 0.05, 1e-6));
    }

    #[test]
    fn test_inverse_normal_round_trip() {
        for p in [0.001, 0.01, 0.05, 0.3, 0.5, 0.9, 0.99] {
            assert!(close(norm_cdf(norm_inv(p)), p, 1e-7), "p={p}");
        }
        assert!(close(norm_inv(0.05), -1.644_853_6, 1e-5));
    }

    #[test]
    fn test_correlation_matrix() {
        let a = vec![1.0, 2.0, 3.0, 4.0];
        let b = vec![2.0, 4.0, 6.0, 8.0];
        let c = vec![4.0, 3.0, 2.0, 1.0];
        let m = correlation_matrix(&[a, b, c]);
        assert!(close(m[0][1], 1.0, 1e-12));
        assert!(close(m[0][2], -1.0, 1e-12));
        assert_eq!(m[2][2], 1.0);
    }
}
