use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::graphsense::ScreeningRequest;
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson};
use axum::extract::State;
use platform::graphsense::{AddressInfo, ScreeningResult};
use tracing::info;
use types::auth::Role;

const INVESTIGATORS: &[Role] = &[Role::Compliance, Role::Security, Role::Admin];

pub async fn address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath((currency, address)): ValidPath<(String, String)>,
) -> Result<ApiResponse<AddressInfo>, AppError> {
    user.require_any_role(INVESTIGATORS)?;

    Ok(ApiResponse::ok(state.platform.graphsense.address(&currency, &address).await?))
}

pub async fn screen(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<ScreeningRequest>,
) -> Result<ApiResponse<ScreeningResult>, AppError> {
    user.require_any_role(INVESTIGATORS)?;

    let result = state
        .platform
        .graphsense
        .screen(&payload.currency, &payload.address)
        .await?;
    info!(
        user_id = %user.user_id,
        currency = %result.currency,
        risk_score = result.risk_score,
        "address screened"
    );
    Ok(ApiResponse::ok(result))
}
