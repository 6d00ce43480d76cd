use crate::auth::{AuthenticatedUser, require_kyc};
use crate::error::AppError;
use crate::models::cex::{CreditThalRequest, StakeRequest};
use crate::models::exchange::CreateOrderRequest;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::ValidatedJson;
use axum::extract::State;
use platform::native_cex::CexExecution;
use types::auth::{KycLevel, Role};
use types::fee::{FeeSchedule, ThalAccount};
use types::order::NewOrder;

pub async fn fee_schedule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<FeeSchedule>, AppError> {
    Ok(ApiResponse::ok(state.platform.cex.fee_schedule(&user.user_id).await))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreateOrderRequest>,
) -> Result<ApiResponse<CexExecution>, AppError> {
    // 1. Check rate limits (API level)
    state.rate_limiter.check(user.user_id, "order_placement")?;

    // 2. Identity verification
    require_kyc(&state, &user, KycLevel::BASIC).await?;

    // 3. Forward with fee settlement
    let order = NewOrder {
        user_id: user.user_id,
        tenant_id: user.tenant_id.clone(),
        symbol: payload.symbol,
        side: payload.side,
        order_type: payload.order_type,
        price: payload.price,
        quantity: payload.quantity,
        time_in_force: payload.time_in_force.unwrap_or_default(),
    };
    let execution = state.platform.cex.place_order(order, payload.pay_fees_in_thal).await?;
    state.metrics.order_placed();

    Ok(ApiResponse::created(execution))
}

pub async fn credit_thal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreditThalRequest>,
) -> Result<ApiResponse<ThalAccount>, AppError> {
    user.require_any_role(&[Role::Admin])?;

    let account = state.platform.cex.credit_thal(&payload.user_id, payload.amount).await?;
    Ok(ApiResponse::ok(account))
}

pub async fn stake(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<StakeRequest>,
) -> Result<ApiResponse<ThalAccount>, AppError> {
    Ok(ApiResponse::ok(state.platform.cex.stake(&user.user_id, payload.amount).await?))
}

pub async fn unstake(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<StakeRequest>,
) -> Result<ApiResponse<ThalAccount>, AppError> {
    Ok(ApiResponse::ok(state.platform.cex.unstake(&user.user_id, payload.amount).await?))
}

pub async fn thal_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<ThalAccount>, AppError> {
    Ok(ApiResponse::ok(state.platform.cex.thal_account(&user.user_id).await))
}
