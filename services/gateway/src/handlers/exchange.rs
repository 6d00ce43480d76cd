use crate::auth::{AuthenticatedUser, require_kyc};
use crate::error::AppError;
use crate::models::exchange::{
    CreateMarketRequest, CreateOrderRequest, OrderBookQuery, OrderExecution, OrderListQuery, TradeQuery,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson, ValidatedQuery};
use axum::extract::State;
use matching_engine::OrderFilter;
use types::auth::{KycLevel, Role};
use types::ids::{MarketId, OrderId};
use types::market::{Market, OrderBookSnapshot};
use types::order::{CancelReason, NewOrder, Order};
use types::trade::Trade;

pub async fn list_markets(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Market>>, AppError> {
    Ok(ApiResponse::ok(state.platform.exchange.list_markets().await))
}

pub async fn create_market(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateMarketRequest>,
) -> Result<ApiResponse<Market>, AppError> {
    user.require_any_role(&[Role::Admin])?;

    let market = state
        .platform
        .exchange
        .create_market(Market {
            symbol: payload.symbol,
            tick_size: payload.tick_size,
            lot_size: payload.lot_size,
            min_notional: payload.min_notional,
        })
        .await?;
    Ok(ApiResponse::created(market))
}

pub async fn order_book(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidPath(symbol): ValidPath<String>,
    ValidatedQuery(query): ValidatedQuery<OrderBookQuery>,
) -> Result<ApiResponse<OrderBookSnapshot>, AppError> {
    let symbol = MarketId::from_path(&symbol).map_err(|e| AppError::validation(e.to_string()))?;
    let book = state.platform.exchange.order_book(&symbol, query.depth).await?;
    Ok(ApiResponse::ok(book))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateOrderRequest>,
) -> Result<ApiResponse<OrderExecution>, AppError> {
    // 1. Check rate limits (API level)
    state.rate_limiter.check(user.user_id, "order_placement")?;

    // 2. Identity verification
    require_kyc(&state, &user, KycLevel::BASIC).await?;

    // 3. Forward to the exchange
    let report = state
        .platform
        .exchange
        .place_order(NewOrder {
            user_id: user.user_id,
            tenant_id: user.tenant_id.clone(),
            symbol: payload.symbol,
            side: payload.side,
            order_type: payload.order_type,
            price: payload.price,
            quantity: payload.quantity,
            time_in_force: payload.time_in_force.unwrap_or_default(),
        })
        .await?;
    state.metrics.order_placed();

    Ok(ApiResponse::created(report.into()))
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<OrderListQuery>,
) -> Result<ApiResponse<Vec<Order>>, AppError> {
    let subject = user.subject(&state, query.user_id)?;
    let symbol = query.market().map_err(AppError::Validation)?;

    let orders = state
        .platform
        .exchange
        .list_orders(OrderFilter {
            user_id: Some(subject),
            tenant_id: None,
            symbol,
            open_only: query.open_only,
        })
        .await;
    Ok(ApiResponse::ok(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(order_id): ValidPath<OrderId>,
) -> Result<ApiResponse<Order>, AppError> {
    let order = state.platform.exchange.get_order(&order_id).await?;
    user.authorize_owner(&state, &order.user_id)?;
    Ok(ApiResponse::ok(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(order_id): ValidPath<OrderId>,
) -> Result<ApiResponse<Order>, AppError> {
    // 1. Rate limiting
    state.rate_limiter.check(user.user_id, "order_cancel")?;

    // 2. Ownership
    let order = state.platform.exchange.get_order(&order_id).await?;
    user.authorize_owner_or_admin(&order.user_id)?;

    // 3. Forward
    let reason = if order.user_id == user.user_id {
        CancelReason::UserRequested
    } else {
        CancelReason::AdminCancel
    };
    let canceled = state.platform.exchange.cancel_order(&order_id, reason).await?;
    Ok(ApiResponse::ok(canceled))
}

pub async fn list_trades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<TradeQuery>,
) -> Result<ApiResponse<Vec<Trade>>, AppError> {
    let symbol = query.market().map_err(AppError::Validation)?;
    let trades = state
        .platform
        .exchange
        .trades(&user.user_id, symbol.as_ref(), query.limit)
        .await;
    Ok(ApiResponse::ok(trades))
}
