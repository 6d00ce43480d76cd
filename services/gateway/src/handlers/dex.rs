use crate::auth::{AuthenticatedUser, require_kyc};
use crate::error::AppError;
use crate::models::dex::{
    AddLiquidityRequest, CreatePoolRequest, QuoteQuery, SwapRequestBody, WithdrawLiquidityRequest,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson, ValidatedQuery};
use axum::extract::State;
use platform::dex::{NewPool, SwapRequest};
use types::auth::{KycLevel, Role};
use types::dex::{LiquidityPosition, LiquidityWithdrawal, Pool, Swap, SwapQuote};
use types::ids::LiquidityPositionId;

pub async fn list_pools(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Pool>>, AppError> {
    Ok(ApiResponse::ok(state.platform.dex.pools().await))
}

pub async fn create_pool(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreatePoolRequest>,
) -> Result<ApiResponse<Pool>, AppError> {
    user.require_any_role(&[Role::Admin])?;

    let pool = state
        .platform
        .dex
        .create_pool(NewPool {
            token_a: payload.token_a,
            token_b: payload.token_b,
            fee_bps: payload.fee_bps,
            initial_a: payload.initial_a,
            initial_b: payload.initial_b,
            created_by: user.user_id,
        })
        .await?;
    Ok(ApiResponse::created(pool))
}

pub async fn quote(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<QuoteQuery>,
) -> Result<ApiResponse<SwapQuote>, AppError> {
    let quote = state
        .platform
        .dex
        .quote(&query.token_in, &query.token_out, query.amount_in)
        .await?;
    Ok(ApiResponse::ok(quote))
}

pub async fn swap(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<SwapRequestBody>,
) -> Result<ApiResponse<Swap>, AppError> {
    state.rate_limiter.check(user.user_id, "swap")?;
    require_kyc(&state, &user, KycLevel::BASIC).await?;

    let swap = state
        .platform
        .dex
        .swap(SwapRequest {
            user_id: user.user_id,
            tenant_id: user.tenant_id.clone(),
            token_in: payload.token_in,
            token_out: payload.token_out,
            amount_in: payload.amount_in,
            min_amount_out: payload.min_amount_out,
            recipient: payload.recipient,
        })
        .await?;
    Ok(ApiResponse::created(swap))
}

pub async fn list_swaps(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Swap>>, AppError> {
    Ok(ApiResponse::ok(state.platform.dex.swaps(&user.user_id).await))
}

pub async fn add_liquidity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<AddLiquidityRequest>,
) -> Result<ApiResponse<LiquidityPosition>, AppError> {
    require_kyc(&state, &user, KycLevel::BASIC).await?;

    let position = state
        .platform
        .dex
        .add_liquidity(&user.user_id, &payload.pool_id, payload.amount_a, payload.amount_b)
        .await?;
    Ok(ApiResponse::created(position))
}

pub async fn withdraw_liquidity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(position_id): ValidPath<LiquidityPositionId>,
    ValidatedJson(payload): ValidatedJson<WithdrawLiquidityRequest>,
) -> Result<ApiResponse<LiquidityWithdrawal>, AppError> {
    let position = state.platform.dex.get_liquidity_position(&position_id).await?;
    if position.user_id != user.user_id {
        return Err(AppError::forbidden("Liquidity position belongs to another user"));
    }

    let withdrawal = state
        .platform
        .dex
        .withdraw_liquidity(&position_id, payload.share_bps)
        .await?;
    Ok(ApiResponse::ok(withdrawal))
}

pub async fn list_liquidity(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<LiquidityPosition>>, AppError> {
    Ok(ApiResponse::ok(state.platform.dex.liquidity_positions(&user.user_id).await))
}
