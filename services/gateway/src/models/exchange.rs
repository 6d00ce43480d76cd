use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{MarketId, UserId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side, TimeInForce};
use types::trade::Trade;

use super::parse_market;
use crate::validation::{Validate, ValidationResult, in_range, non_negative, positive};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMarketRequest {
    pub symbol: MarketId,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_notional: Decimal,
}

impl Validate for CreateMarketRequest {
    fn validate(&self) -> ValidationResult {
        positive("tick_size", self.tick_size)?;
        positive("lot_size", self.lot_size)?;
        non_negative("min_notional", self.min_notional)
    }
}

fn default_depth() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderBookQuery {
    #[serde(default = "default_depth")]
    pub depth: usize,
}

impl Validate for OrderBookQuery {
    fn validate(&self) -> ValidationResult {
        in_range("depth", self.depth, 1, 100)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub symbol: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub time_in_force: Option<TimeInForce>,
    /// Native CEX only
    #[serde(default)]
    pub pay_fees_in_thal: bool,
}

impl Validate for CreateOrderRequest {
    fn validate(&self) -> ValidationResult {
        if self.quantity.is_zero() {
            return Err("quantity must be positive".to_string());
        }
        match (self.order_type, self.price) {
            (OrderType::Limit, None) => Err("price is required for LIMIT orders".to_string()),
            (OrderType::Market, Some(_)) => Err("price must be omitted for MARKET orders".to_string()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    pub user_id: Option<UserId>,
    pub symbol: Option<String>,
    #[serde(default)]
    pub open_only: bool,
}

impl OrderListQuery {
    pub fn market(&self) -> Result<Option<MarketId>, String> {
        self.symbol.as_deref().map(|raw| parse_market("symbol", raw)).transpose()
    }
}

impl Validate for OrderListQuery {
    fn validate(&self) -> ValidationResult {
        self.market().map(|_| ())
    }
}

fn default_trade_limit() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeQuery {
    pub symbol: Option<String>,
    #[serde(default = "default_trade_limit")]
    pub limit: usize,
}

impl TradeQuery {
    pub fn market(&self) -> Result<Option<MarketId>, String> {
        self.symbol.as_deref().map(|raw| parse_market("symbol", raw)).transpose()
    }
}

impl Validate for TradeQuery {
    fn validate(&self) -> ValidationResult {
        in_range("limit", self.limit, 1, 500)?;
        self.market().map(|_| ())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderExecution {
    pub order: Order,
    pub trades: Vec<Trade>,
}

impl From<matching_engine::ExecutionReport> for OrderExecution {
    fn from(report: matching_engine::ExecutionReport) -> Self {
        Self {
            order: report.order,
            trades: report.trades,
        }
    }
}
