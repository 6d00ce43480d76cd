use crate::handlers::{
    admin, cex, dex, exchange, graphsense, health, kyc, margin, quant, security, token_sale, wallet,
};
use crate::error::AppError;
use crate::metrics::track_requests;
use crate::state::AppState;
use axum::{
    Router,
    extract::Request,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

fn exchange_routes() -> Router<AppState> {
    Router::new()
        .route("/markets", get(exchange::list_markets).post(exchange::create_market))
        .route("/markets/{symbol}/orderbook", get(exchange::order_book))
        .route("/orders", get(exchange::list_orders).post(exchange::create_order))
        .route("/orders/{id}", get(exchange::get_order).delete(exchange::cancel_order))
        .route("/trades", get(exchange::list_trades))
}

fn margin_routes() -> Router<AppState> {
    Router::new()
        .route("/account", get(margin::get_account))
        .route("/account/deposit", post(margin::deposit))
        .route("/account/withdraw", post(margin::withdraw))
        .route("/positions", get(margin::list_positions).post(margin::open_position))
        .route("/positions/{id}/close", post(margin::close_position))
        .route("/mark-prices", post(margin::update_mark_price))
        .route("/health", get(margin::health))
}

fn dex_routes() -> Router<AppState> {
    Router::new()
        .route("/pools", get(dex::list_pools).post(dex::create_pool))
        .route("/quote", get(dex::quote))
        .route("/swaps", get(dex::list_swaps).post(dex::swap))
        .route("/liquidity", get(dex::list_liquidity).post(dex::add_liquidity))
        .route("/liquidity/{id}/withdraw", post(dex::withdraw_liquidity))
}

fn kyc_routes() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(kyc::list_submissions).post(kyc::submit))
        .route("/submissions/{id}/review", post(kyc::review))
        .route("/status", get(kyc::status))
}

fn token_sale_routes() -> Router<AppState> {
    Router::new()
        .route("/phases", get(token_sale::list_phases).post(token_sale::create_phase))
        .route(
            "/investments",
            get(token_sale::list_investments).post(token_sale::invest),
        )
        .route("/investments/{id}/vesting", get(token_sale::vesting))
        .route("/investments/{id}/claim", post(token_sale::claim))
}

fn security_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(security::list_events).post(security::record_event))
        .route(
            "/incidents",
            get(security::list_incidents).post(security::open_incident),
        )
        .route("/incidents/{id}", patch(security::update_incident))
        .route("/risk-assessments", post(security::assess))
        .route("/risk-assessments/{user_id}", get(security::list_assessments))
        .route("/overview", get(security::overview))
}

fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet::list_wallets).post(wallet::link_wallet))
        .route("/challenges", post(wallet::create_challenge))
        .route("/{id}", delete(wallet::unlink_wallet))
        .route("/{id}/primary", post(wallet::set_primary))
}

fn cex_routes() -> Router<AppState> {
    Router::new()
        .route("/fees", get(cex::fee_schedule))
        .route("/orders", post(cex::create_order))
        .route("/thal", get(cex::thal_account))
        .route("/thal/credit", post(cex::credit_thal))
        .route("/thal/stake", post(cex::stake))
        .route("/thal/unstake", post(cex::unstake))
}

fn graphsense_routes() -> Router<AppState> {
    Router::new()
        .route("/screenings", post(graphsense::screen))
        .route("/{currency}/addresses/{address}", get(graphsense::address))
}

fn migration_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::list_runs))
        .route("/tenant-transfers", post(admin::tenant_transfer))
        .route("/{id}", get(admin::get_run))
}

fn quant_routes() -> Router<AppState> {
    Router::new()
        .route("/pricing/options/black-scholes", post(quant::black_scholes))
        .route("/pricing/options/american", post(quant::american))
        .route("/pricing/options/binomial", post(quant::binomial))
        .route("/pricing/options/monte-carlo", post(quant::monte_carlo))
        .route("/pricing/options/greeks", get(quant::greeks))
        .route("/pricing/options/implied-volatility", post(quant::implied_volatility))
        .route("/pricing/bonds", post(quant::bond))
        .route("/pricing/bonds/yield", post(quant::bond_yield))
        .route("/risk/var", post(quant::value_at_risk))
        .route("/risk/var/portfolio", post(quant::portfolio_var))
        .route("/risk/var/methods", get(quant::var_methods))
        .route("/risk/portfolio", post(quant::portfolio_risk))
        .route("/risk/stress-test", post(quant::stress_test))
        .route("/analytics/yield-curves", post(quant::yield_curve))
        .route("/analytics/yield-curves/forward-rates", post(quant::forward_rates))
        .route("/analytics/yield-curves/bootstrap-zero", post(quant::bootstrap_zero))
        .route("/analytics/yield-curves/methods", get(quant::curve_methods))
        .route("/analytics/volatility-surfaces", post(quant::volatility_surface))
        .route(
            "/analytics/volatility-surfaces/interpolate",
            post(quant::interpolate_volatility),
        )
        .route("/analytics/market", post(quant::market_analysis))
}

/// A panicking handler answers 500 with the usual error envelope
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    AppError::Internal(anyhow::anyhow!("handler panicked: {detail}")).into_response()
}

/// The full application: `/health`, `/metrics` and the `/api/v1` routers
pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/exchange", exchange_routes())
        .nest("/margin", margin_routes())
        .nest("/dex", dex_routes())
        .nest("/kyc", kyc_routes())
        .nest("/token-sale", token_sale_routes())
        .nest("/security", security_routes())
        .nest("/wallets", wallet_routes())
        .nest("/cex", cex_routes())
        .nest("/graphsense", graphsense_routes())
        .nest("/admin/migrations", migration_routes())
        .nest("/quant", quant_routes());

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .nest("/api/v1", api_routes)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(state.metrics.clone(), track_requests))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "http_request",
                request_id = %Uuid::now_v7(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
        .with_state(state)
}
