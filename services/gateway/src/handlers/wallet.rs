use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::wallet::{ChallengeRequest, LinkWalletRequest};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson};
use axum::extract::State;
use platform::wallet::LinkWallet;
use types::ids::WalletId;
use types::wallet::{Wallet, WalletChallenge};

/// Only the owner may touch a wallet; admins included
async fn owned_wallet(state: &AppState, user: &AuthenticatedUser, wallet_id: &WalletId) -> Result<Wallet, AppError> {
    let wallet = state.platform.wallets.get(wallet_id).await?;
    if wallet.user_id != user.user_id {
        return Err(AppError::forbidden("Wallet belongs to another user"));
    }
    Ok(wallet)
}

pub async fn create_challenge(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<ChallengeRequest>,
) -> Result<ApiResponse<WalletChallenge>, AppError> {
    state.rate_limiter.check(user.user_id, "wallet_challenge")?;

    let challenge = state
        .platform
        .wallets
        .create_challenge(&user.user_id, payload.chain, &payload.address)
        .await?;
    Ok(ApiResponse::created(challenge))
}

pub async fn link_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<LinkWalletRequest>,
) -> Result<ApiResponse<Wallet>, AppError> {
    let wallet = state
        .platform
        .wallets
        .link(LinkWallet {
            user_id: user.user_id,
            chain: payload.chain,
            address: payload.address,
            label: payload.label.map(|label| label.trim().to_string()),
            challenge_id: payload.challenge_id,
            signature: payload.signature,
        })
        .await?;
    Ok(ApiResponse::created(wallet))
}

pub async fn list_wallets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<Wallet>>, AppError> {
    Ok(ApiResponse::ok(state.platform.wallets.wallets(&user.user_id).await))
}

pub async fn set_primary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(wallet_id): ValidPath<WalletId>,
) -> Result<ApiResponse<Wallet>, AppError> {
    owned_wallet(&state, &user, &wallet_id).await?;
    Ok(ApiResponse::ok(state.platform.wallets.set_primary(&wallet_id).await?))
}

pub async fn unlink_wallet(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(wallet_id): ValidPath<WalletId>,
) -> Result<ApiResponse<Wallet>, AppError> {
    owned_wallet(&state, &user, &wallet_id).await?;
    Ok(ApiResponse::ok(state.platform.wallets.unlink(&wallet_id).await?))
}
