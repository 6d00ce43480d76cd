use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::quant::{
    BondRequest, BondYield, BondYieldRequest, BootstrapBody, CurveBody, ForwardBody, GreeksQuery, ImpliedVolatility,
    ImpliedVolatilityRequest, InterpolatedVolatility, MarketBody, MonteCarloRequest, OptionRequest, PortfolioBody,
    PortfolioVarBody, StressBody, SurfaceBody, SurfaceInterpolationRequest, TreeRequest, VarBody,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidatedJson, ValidatedQuery};
use axum::extract::State;
use quant::QuantResult;
use quant::analytics::market::{self, MarketAnalysis};
use quant::analytics::volatility_surface::SurfaceAnalysis;
use quant::analytics::yield_curve::{self, ForwardRate, YieldCurve, ZeroCurve};
use quant::pricing::binomial::{self, Exercise};
use quant::pricing::bond::{self, BondValuation};
use quant::pricing::monte_carlo::{self, MonteCarloValuation};
use quant::pricing::{Greeks, OptionValuation, black_scholes};
use quant::risk::portfolio::{self, PortfolioRisk};
use quant::risk::stress::{self, StressReport};
use quant::risk::var::{self, PortfolioVarReport, VarReport};
use tracing::debug;

/// Runs CPU-heavy model code off the async workers
async fn blocking<T, F>(job: F) -> Result<T, AppError>
where
    F: FnOnce() -> QuantResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(result?)
}

// --- Pricing ---

pub async fn black_scholes(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<OptionRequest>,
) -> Result<ApiResponse<OptionValuation>, AppError> {
    let valuation = black_scholes::valuation(&payload.params)?;
    state.metrics.option_priced(valuation.model);
    Ok(ApiResponse::ok(valuation))
}

pub async fn american(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<TreeRequest>,
) -> Result<ApiResponse<OptionValuation>, AppError> {
    let valuation = blocking(move || binomial::valuation(&payload.params, payload.steps, Exercise::American)).await?;
    state.metrics.option_priced(valuation.model);
    Ok(ApiResponse::ok(valuation))
}

pub async fn binomial(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<TreeRequest>,
) -> Result<ApiResponse<OptionValuation>, AppError> {
    let valuation = blocking(move || binomial::valuation(&payload.params, payload.steps, Exercise::European)).await?;
    state.metrics.option_priced(valuation.model);
    Ok(ApiResponse::ok(valuation))
}

pub async fn monte_carlo(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<MonteCarloRequest>,
) -> Result<ApiResponse<MonteCarloValuation>, AppError> {
    debug!(simulations = payload.num_simulations, seed = payload.seed, "monte carlo pricing");
    let valuation =
        blocking(move || monte_carlo::price(&payload.params, payload.num_simulations, payload.seed)).await?;
    state.metrics.option_priced(valuation.model);
    Ok(ApiResponse::ok(valuation))
}

pub async fn greeks(
    _user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<GreeksQuery>,
) -> Result<ApiResponse<Greeks>, AppError> {
    Ok(ApiResponse::ok(black_scholes::greeks(&query.params())?))
}

pub async fn implied_volatility(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<ImpliedVolatilityRequest>,
) -> Result<ApiResponse<ImpliedVolatility>, AppError> {
    let params = payload.params();
    let implied_volatility = black_scholes::implied_volatility(&params, payload.market_price)?;
    Ok(ApiResponse::ok(ImpliedVolatility {
        implied_volatility,
        market_price: payload.market_price,
        parameters: params,
    }))
}

pub async fn bond(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<BondRequest>,
) -> Result<ApiResponse<BondValuation>, AppError> {
    Ok(ApiResponse::ok(bond::valuation(&payload.params)?))
}

pub async fn bond_yield(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<BondYieldRequest>,
) -> Result<ApiResponse<BondYield>, AppError> {
    let params = payload.params();
    let yield_to_maturity = bond::yield_from_price(&params, payload.market_price)?;
    Ok(ApiResponse::ok(BondYield {
        yield_to_maturity,
        market_price: payload.market_price,
        parameters: bond::BondParams {
            yield_rate: yield_to_maturity,
            ..params
        },
    }))
}

// --- Risk ---

pub async fn value_at_risk(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<VarBody>,
) -> Result<ApiResponse<VarReport>, AppError> {
    let method = payload.request.method;
    let report = blocking(move || var::calculate(&payload.request)).await?;
    state.metrics.var_calculated(method.as_str());
    Ok(ApiResponse::ok(report))
}

pub async fn portfolio_var(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<PortfolioVarBody>,
) -> Result<ApiResponse<PortfolioVarReport>, AppError> {
    let method = payload.request.method;
    let report = blocking(move || var::portfolio(&payload.request)).await?;
    state.metrics.var_calculated(method.as_str());
    Ok(ApiResponse::ok(report))
}

pub async fn var_methods(_user: AuthenticatedUser) -> ApiResponse<Vec<var::MethodInfo>> {
    ApiResponse::ok(var::methods())
}

pub async fn portfolio_risk(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<PortfolioBody>,
) -> Result<ApiResponse<PortfolioRisk>, AppError> {
    let risk = blocking(move || portfolio::analyze(&payload.request)).await?;
    Ok(ApiResponse::ok(risk))
}

pub async fn stress_test(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<StressBody>,
) -> Result<ApiResponse<StressReport>, AppError> {
    Ok(ApiResponse::ok(stress::run(&payload.request)?))
}

// --- Analytics ---

pub async fn yield_curve(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CurveBody>,
) -> Result<ApiResponse<YieldCurve>, AppError> {
    Ok(ApiResponse::ok(yield_curve::build(&payload.request)?))
}

pub async fn forward_rates(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<ForwardBody>,
) -> Result<ApiResponse<Vec<ForwardRate>>, AppError> {
    Ok(ApiResponse::ok(yield_curve::forward_rates(&payload.request)?))
}

pub async fn bootstrap_zero(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<BootstrapBody>,
) -> Result<ApiResponse<ZeroCurve>, AppError> {
    Ok(ApiResponse::ok(yield_curve::bootstrap_zero(&payload.request)?))
}

pub async fn curve_methods(_user: AuthenticatedUser) -> ApiResponse<Vec<yield_curve::MethodInfo>> {
    ApiResponse::ok(yield_curve::methods())
}

pub async fn volatility_surface(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<SurfaceBody>,
) -> Result<ApiResponse<SurfaceAnalysis>, AppError> {
    Ok(ApiResponse::ok(payload.surface.analyze()?))
}

pub async fn interpolate_volatility(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<SurfaceInterpolationRequest>,
) -> Result<ApiResponse<InterpolatedVolatility>, AppError> {
    let volatility = payload.surface.interpolate(payload.strike, payload.maturity)?;
    Ok(ApiResponse::ok(InterpolatedVolatility {
        strike: payload.strike,
        maturity: payload.maturity,
        volatility,
    }))
}

pub async fn market_analysis(
    _user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<MarketBody>,
) -> Result<ApiResponse<MarketAnalysis>, AppError> {
    Ok(ApiResponse::ok(market::analyze(&payload.request)?))
}
