use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::admin::{IDEMPOTENCY_KEY_HEADER, IDEMPOTENT_REPLAYED_HEADER, TenantTransferRequest};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{Validate, ValidPath};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use platform::idempotency::{IdempotencyOutcome, StoredResponse, request_fingerprint};
use platform::migration::TenantTransfer;
use tracing::{debug, info};
use types::auth::Role;
use types::ids::MigrationId;
use types::migration::MigrationRun;

const MIGRATORS: &[Role] = &[Role::Admin];

fn idempotency_key(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::validation("Idempotency-Key header is required"))
}

fn replay(stored: StoredResponse) -> Result<Response, AppError> {
    let status = StatusCode::from_u16(stored.status)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("stored status {}: {e}", stored.status)))?;
    let mut response = (status, Json(stored.body)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(IDEMPOTENT_REPLAYED_HEADER),
        HeaderValue::from_static("true"),
    );
    Ok(response)
}

async fn transfer(state: &AppState, user: &AuthenticatedUser, body: &[u8]) -> Result<MigrationRun, AppError> {
    let payload: TenantTransferRequest =
        serde_json::from_slice(body).map_err(|e| AppError::validation(format!("Invalid JSON body: {e}")))?;
    payload.validate().map_err(AppError::Validation)?;

    let run = state
        .platform
        .migrations
        .tenant_transfer(TenantTransfer {
            user_id: payload.user_id,
            from_tenant: payload.from_tenant,
            to_tenant: payload.to_tenant,
            reason: payload.reason.trim().to_string(),
            requested_by: user.user_id,
        })
        .await?;
    Ok(run)
}

pub async fn tenant_transfer(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    // 1. Authorization
    user.require_any_role(MIGRATORS)?;

    // 2. Claim the idempotency key, or replay what it already produced
    let key = idempotency_key(&headers)?;
    let fingerprint = request_fingerprint(&body);
    let idempotency = &state.platform.idempotency;
    if let IdempotencyOutcome::Replay(stored) = idempotency.begin(&user.tenant_id, &key, &fingerprint).await? {
        debug!(%key, status = stored.status, "replaying idempotent response");
        return replay(stored);
    }

    // 3. Execute and remember the outcome
    let outcome = transfer(&state, &user, &body).await.and_then(|run| {
        let response = ApiResponse::created(run);
        let stored = response.to_value().map_err(|e| AppError::Internal(e.into()))?;
        Ok((response, stored))
    });

    match outcome {
        Ok((response, stored)) => {
            info!(%key, requested_by = %user.user_id, "tenant transfer executed");
            let record = StoredResponse {
                status: response.status().as_u16(),
                body: stored,
            };
            idempotency.complete(&user.tenant_id, &key, record).await;
            Ok(response.into_response())
        }
        Err(err) if err.is_transient() => {
            idempotency.abandon(&user.tenant_id, &key).await;
            Err(err)
        }
        Err(err) => {
            let record = StoredResponse {
                status: err.status_and_code().0.as_u16(),
                body: err.to_value(),
            };
            idempotency.complete(&user.tenant_id, &key, record).await;
            Err(err)
        }
    }
}

pub async fn list_runs(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<Vec<MigrationRun>>, AppError> {
    user.require_any_role(MIGRATORS)?;

    Ok(ApiResponse::ok(state.platform.migrations.runs().await))
}

pub async fn get_run(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(migration_id): ValidPath<MigrationId>,
) -> Result<ApiResponse<MigrationRun>, AppError> {
    user.require_any_role(MIGRATORS)?;

    Ok(ApiResponse::ok(state.platform.migrations.run(&migration_id).await?))
}
