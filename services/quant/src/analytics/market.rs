//! Technical indicators over a price series

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, invalid, QuantError, QuantResult};
use crate::stats::{mean, std_dev};

const RSI_PERIOD: usize = 14;
const BOLLINGER_PERIOD: usize = 20;
const BOLLINGER_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRequest {
    pub prices: Vec<f64>,
    #[serde(default)]
    pub volumes: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAnalysis {
    pub current_price: f64,
    pub returns: Vec<f64>,
    pub mean_return: f64,
    pub volatility: f64,
    pub sma_20: f64,
    pub sma_50: f64,
    pub rsi: f64,
    pub bollinger_bands: BollingerBands,
    pub data_points: usize,
    pub avg_volume: Option<f64>,
}

/// Mean of the trailing `window` points, or of all points when shorter
pub fn sma(prices: &[f64], window: usize) -> f64 {
    let start = prices.len().saturating_sub(window);
    mean(&prices[start..])
}

/// Simple-average RSI over the last 14 price changes; 50 when there are
/// fewer than 15 prices.
pub fn rsi(prices: &[f64]) -> f64 {
    if prices.len() <= RSI_PERIOD {
        return 50.0;
    }
    let tail = &prices[prices.len() - RSI_PERIOD - 1..];
    let (gains, losses) = tail.windows(2).fold((0.0, 0.0), |(g, l), w| {
        let delta = w[1] - w[0];
        if delta > 0.0 {
            (g + delta, l)
        } else {
            (g, l - delta)
        }
    });
    let avg_gain = gains / RSI_PERIOD as f64;
    let avg_loss = losses / RSI_PERIOD as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}

pub fn bollinger(prices: &[f64]) -> BollingerBands {
    let start = prices.len().saturating_sub(BOLLINGER_PERIOD);
    let window = &prices[start..];
    let middle = mean(window);
    let width = BOLLINGER_WIDTH * std_dev(window);
    BollingerBands {
        upper: middle + width,
        middle,
        lower: middle - width,
    }
}

pub fn analyze(request: &MarketRequest) -> QuantResult<MarketAnalysis> {
    let prices = &request.prices;
    if prices.len() < 2 {
        return Err(invalid("prices", "need at least 2 observations"));
    }
    ensure_finite("prices", prices)?;
    if prices.iter().any(|p| *p <= 0.0) {
        return Err(invalid("prices", "must be positive"));
    }
    let avg_volume = match &request.volumes {
        Some(v) if v.len() != prices.len() => {
            return Err(QuantError::DimensionMismatch(format!(
                "{} volumes for {} prices",
                v.len(),
                prices.len()
            )))
        }
        Some(v) => {
            ensure_finite("volumes", v)?;
            Some(mean(v))
        }
        None => None,
    };

    let returns: Vec<f64> = prices.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    Ok(MarketAnalysis {
        current_price: prices[prices.len() - 1],
        mean_return: mean(&returns),
        volatility: std_dev(&returns),
        returns,
        sma_20: sma(prices, 20),
        sma_50: sma(prices, 50),
        rsi: rsi(prices),
        bollinger_bands: bollinger(prices),
        data_points: prices.len(),
        avg_volume,
    })
}
