use crate::auth::{AuthenticatedUser, require_kyc};
use crate::error::AppError;
use crate::models::margin::{
    AccountQuery, AmountRequest, ClosePositionRequest, MarkPriceRequest, OpenPositionRequest, PositionQuery,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson, ValidatedQuery};
use axum::extract::State;
use platform::margin::OpenPosition;
use types::auth::{KycLevel, Role};
use types::ids::{PositionId, TenantId, UserId};
use types::margin::{AccountHealth, MarginAccount, Position};

/// Tenant a subject's account lives in
fn tenant_of(state: &AppState, user: &AuthenticatedUser, subject: &UserId) -> TenantId {
    state
        .platform
        .tenants
        .tenant_of(subject)
        .unwrap_or_else(|| user.tenant_id.clone())
}

pub async fn get_account(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<AccountQuery>,
) -> Result<ApiResponse<MarginAccount>, AppError> {
    let subject = user.subject(&state, query.user_id)?;
    let tenant = tenant_of(&state, &user, &subject);
    Ok(ApiResponse::ok(state.platform.margin.account(&subject, &tenant).await))
}

pub async fn deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<AmountRequest>,
) -> Result<ApiResponse<MarginAccount>, AppError> {
    let account = state
        .platform
        .margin
        .deposit(&user.user_id, &user.tenant_id, payload.amount)
        .await?;
    Ok(ApiResponse::ok(account))
}

pub async fn withdraw(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<AmountRequest>,
) -> Result<ApiResponse<MarginAccount>, AppError> {
    let account = state
        .platform
        .margin
        .withdraw(&user.user_id, &user.tenant_id, payload.amount)
        .await?;
    Ok(ApiResponse::ok(account))
}

pub async fn open_position(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<OpenPositionRequest>,
) -> Result<ApiResponse<Position>, AppError> {
    require_kyc(&state, &user, KycLevel::VERIFIED).await?;

    let position = state
        .platform
        .margin
        .open_position(OpenPosition {
            user_id: user.user_id,
            tenant_id: user.tenant_id.clone(),
            symbol: payload.symbol,
            side: payload.side,
            size: payload.size,
            leverage: payload.leverage,
            entry_price: payload.entry_price,
        })
        .await?;
    Ok(ApiResponse::created(position))
}

pub async fn list_positions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<PositionQuery>,
) -> Result<ApiResponse<Vec<Position>>, AppError> {
    let positions = state
        .platform
        .margin
        .positions(&user.user_id, query.include_closed)
        .await;
    Ok(ApiResponse::ok(positions))
}

pub async fn close_position(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(position_id): ValidPath<PositionId>,
    ValidatedJson(payload): ValidatedJson<ClosePositionRequest>,
) -> Result<ApiResponse<Position>, AppError> {
    let position = state.platform.margin.get_position(&position_id).await?;
    if position.user_id != user.user_id {
        return Err(AppError::forbidden("Position belongs to another user"));
    }

    let closed = state
        .platform
        .margin
        .close_position(&position_id, payload.exit_price)
        .await?;
    Ok(ApiResponse::ok(closed))
}

pub async fn update_mark_price(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<MarkPriceRequest>,
) -> Result<ApiResponse<Vec<Position>>, AppError> {
    user.require_any_role(&[Role::Admin])?;

    let liquidated = state
        .platform
        .margin
        .update_mark_price(&payload.symbol, payload.price)
        .await?;
    if !liquidated.is_empty() {
        tracing::warn!(symbol = %payload.symbol, count = liquidated.len(), "positions liquidated");
    }
    Ok(ApiResponse::ok(liquidated))
}

pub async fn health(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<AccountHealth>, AppError> {
    let health = state.platform.margin.health(&user.user_id, &user.tenant_id).await;
    Ok(ApiResponse::ok(health))
}
