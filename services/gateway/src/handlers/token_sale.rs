use crate::auth::{AuthenticatedUser, require_kyc};
use crate::error::AppError;
use crate::models::token_sale::{CreatePhaseRequest, InvestRequest};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson};
use axum::extract::State;
use platform::token_sale::{ClaimReceipt, NewInvestment, NewPhase};
use types::auth::{KycLevel, Role};
use types::ids::InvestmentId;
use types::token_sale::{Investment, PhaseView, VestingStatus};

pub async fn list_phases(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<PhaseView>>, AppError> {
    Ok(ApiResponse::ok(state.platform.token_sale.phases(&user.tenant_id).await))
}

pub async fn create_phase(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<CreatePhaseRequest>,
) -> Result<ApiResponse<PhaseView>, AppError> {
    user.require_any_role(&[Role::Admin])?;

    let phase = state
        .platform
        .token_sale
        .create_phase(NewPhase {
            tenant_id: user.tenant_id.clone(),
            name: payload.name.trim().to_string(),
            token_price: payload.token_price,
            token_allocation: payload.token_allocation,
            min_purchase: payload.min_purchase,
            max_purchase: payload.max_purchase,
            starts_at: payload.starts_at,
            ends_at: payload.ends_at,
            vesting: payload.vesting,
        })
        .await?;
    Ok(ApiResponse::created(phase))
}

pub async fn invest(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<InvestRequest>,
) -> Result<ApiResponse<Investment>, AppError> {
    state.rate_limiter.check(user.user_id, "investment")?;
    require_kyc(&state, &user, KycLevel::VERIFIED).await?;

    let investment = state
        .platform
        .token_sale
        .invest(NewInvestment {
            user_id: user.user_id,
            tenant_id: user.tenant_id.clone(),
            phase_id: payload.phase_id,
            amount: payload.amount,
            wallet_address: payload.wallet_address.to_ascii_lowercase(),
        })
        .await?;
    Ok(ApiResponse::created(investment))
}

pub async fn list_investments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Investment>>, AppError> {
    Ok(ApiResponse::ok(state.platform.token_sale.investments(&user.user_id).await))
}

pub async fn vesting(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(investment_id): ValidPath<InvestmentId>,
) -> Result<ApiResponse<VestingStatus>, AppError> {
    let investment = state.platform.token_sale.get_investment(&investment_id).await?;
    user.authorize_owner_or_admin(&investment.user_id)?;

    Ok(ApiResponse::ok(state.platform.token_sale.vesting(&investment_id).await?))
}

pub async fn claim(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(investment_id): ValidPath<InvestmentId>,
) -> Result<ApiResponse<ClaimReceipt>, AppError> {
    let investment = state.platform.token_sale.get_investment(&investment_id).await?;
    if investment.user_id != user.user_id {
        return Err(AppError::forbidden("Investment belongs to another user"));
    }

    Ok(ApiResponse::ok(state.platform.token_sale.claim(&investment_id).await?))
}
