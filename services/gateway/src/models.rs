//! Request and response bodies, one module per router

pub mod admin;
pub mod cex;
pub mod dex;
pub mod exchange;
pub mod graphsense;
pub mod kyc;
pub mod margin;
pub mod quant;
pub mod security;
pub mod token_sale;
pub mod wallet;

use types::ids::MarketId;

/// Accepts `BTC/USDT` or the path form `BTC-USDT`
pub fn parse_market(field: &str, raw: &str) -> Result<MarketId, String> {
    let parsed = if raw.contains('/') {
        MarketId::try_new(raw)
    } else {
        MarketId::from_path(raw)
    };
    parsed.map_err(|e| format!("{field}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_market_forms() {
        assert_eq!(parse_market("symbol", "btc-usdt").unwrap().as_str(), "BTC/USDT");
        assert_eq!(parse_market("symbol", "ETH/USDT").unwrap().as_str(), "ETH/USDT");
        assert!(parse_market("symbol", "BTCUSDT").unwrap_err().starts_with("symbol:"));
    }
}
