use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::kyc::{ReviewRequest, SubmissionQuery, SubmitKycRequest};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson, ValidatedQuery};
use axum::extract::State;
use platform::kyc::{NewSubmission, Review};
use types::auth::Role;
use types::ids::KycSubmissionId;
use types::kyc::{KycOverview, KycSubmission};

const REVIEWERS: &[Role] = &[Role::Compliance, Role::Admin];

pub async fn submit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<SubmitKycRequest>,
) -> Result<ApiResponse<KycSubmission>, AppError> {
    let submission = state
        .platform
        .kyc
        .submit(NewSubmission {
            user_id: user.user_id,
            tenant_id: user.tenant_id.clone(),
            full_name: payload.full_name.trim().to_string(),
            date_of_birth: payload.date_of_birth,
            country: payload.country,
            document_type: payload.document_type,
            document_number: payload.document_number,
        })
        .await?;
    Ok(ApiResponse::created(submission))
}

pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<KycOverview>, AppError> {
    Ok(ApiResponse::ok(state.platform.kyc.status(&user.user_id).await))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<SubmissionQuery>,
) -> Result<ApiResponse<Vec<KycSubmission>>, AppError> {
    user.require_any_role(REVIEWERS)?;

    let submissions = state.platform.kyc.list(user.tenant_scope(), query.status).await;
    Ok(ApiResponse::ok(submissions))
}

pub async fn review(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(submission_id): ValidPath<KycSubmissionId>,
    ValidatedJson(payload): ValidatedJson<ReviewRequest>,
) -> Result<ApiResponse<KycSubmission>, AppError> {
    user.require_any_role(REVIEWERS)?;

    let submission = state.platform.kyc.get(&submission_id).await?;
    user.authorize_tenant(&submission.tenant_id)?;
    if submission.user_id == user.user_id {
        return Err(AppError::forbidden("Reviewers cannot review their own submission"));
    }

    let reviewed = state
        .platform
        .kyc
        .review(
            &submission_id,
            Review {
                reviewer: user.user_id,
                decision: payload.decision,
                level: payload.level,
                reason: payload.reason,
            },
        )
        .await?;
    Ok(ApiResponse::ok(reviewed))
}
