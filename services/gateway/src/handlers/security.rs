use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::security::{
    AssessmentRequest, EventQuery, IncidentQuery, OpenIncidentRequest, RecordEventRequest, UpdateIncidentRequest,
};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::validation::{ValidPath, ValidatedJson, ValidatedQuery};
use axum::extract::State;
use platform::security::{EventFilter, EventReceipt, IncidentUpdate, NewEvent, NewIncident};
use tracing::warn;
use types::auth::Role;
use types::ids::{IncidentId, UserId};
use types::security::{Incident, RiskAssessment, SecurityEvent, SecurityOverview};

const RESPONDERS: &[Role] = &[Role::Security, Role::Admin];
const ANALYSTS: &[Role] = &[Role::Security, Role::Compliance, Role::Admin];

pub async fn record_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<RecordEventRequest>,
) -> Result<ApiResponse<EventReceipt>, AppError> {
    user.require_any_role(RESPONDERS)?;

    let receipt = state
        .platform
        .security
        .record_event(NewEvent {
            tenant_id: user.tenant_id.clone(),
            event_type: payload.event_type.trim().to_string(),
            severity: payload.severity,
            source: payload.source.trim().to_string(),
            description: payload.description,
            subject_user_id: payload.user_id,
            reported_by: user.user_id,
        })
        .await?;

    if let Some(incident) = &receipt.incident {
        warn!(
            incident_id = %incident.incident_id,
            event_id = %receipt.event.event_id,
            "critical event opened an incident"
        );
    }
    Ok(ApiResponse::created(receipt))
}

pub async fn list_events(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<EventQuery>,
) -> Result<ApiResponse<Vec<SecurityEvent>>, AppError> {
    user.require_any_role(ANALYSTS)?;

    let filter = EventFilter {
        severity: query.severity,
        subject_user_id: query.user_id,
        limit: query.limit,
    };
    Ok(ApiResponse::ok(state.platform.security.events(user.tenant_scope(), filter).await))
}

pub async fn open_incident(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<OpenIncidentRequest>,
) -> Result<ApiResponse<Incident>, AppError> {
    user.require_any_role(RESPONDERS)?;

    let incident = state
        .platform
        .security
        .open_incident(NewIncident {
            tenant_id: user.tenant_id.clone(),
            title: payload.title.trim().to_string(),
            severity: payload.severity,
            event_ids: payload.event_ids,
            opened_by: user.user_id,
        })
        .await?;
    Ok(ApiResponse::created(incident))
}

pub async fn list_incidents(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedQuery(query): ValidatedQuery<IncidentQuery>,
) -> Result<ApiResponse<Vec<Incident>>, AppError> {
    user.require_any_role(RESPONDERS)?;

    let incidents = state.platform.security.incidents(user.tenant_scope(), query.status).await;
    Ok(ApiResponse::ok(incidents))
}

pub async fn update_incident(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(incident_id): ValidPath<IncidentId>,
    ValidatedJson(payload): ValidatedJson<UpdateIncidentRequest>,
) -> Result<ApiResponse<Incident>, AppError> {
    user.require_any_role(RESPONDERS)?;

    let incident = state.platform.security.get_incident(&incident_id).await?;
    user.authorize_tenant(&incident.tenant_id)?;

    let updated = state
        .platform
        .security
        .update_incident(
            &incident_id,
            IncidentUpdate {
                status: payload.status,
                note: payload.note,
                author: user.user_id,
            },
        )
        .await?;
    Ok(ApiResponse::ok(updated))
}

pub async fn assess(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(payload): ValidatedJson<AssessmentRequest>,
) -> Result<ApiResponse<RiskAssessment>, AppError> {
    user.require_any_role(ANALYSTS)?;

    // Admins assess in the subject's home tenant
    let tenant = if user.is_admin() {
        state
            .platform
            .tenants
            .tenant_of(&payload.user_id)
            .unwrap_or_else(|| user.tenant_id.clone())
    } else {
        user.tenant_id.clone()
    };

    let assessment = state
        .platform
        .security
        .assess(&tenant, &payload.user_id, &user.user_id)
        .await?;
    Ok(ApiResponse::created(assessment))
}

pub async fn list_assessments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidPath(subject): ValidPath<UserId>,
) -> Result<ApiResponse<Vec<RiskAssessment>>, AppError> {
    user.require_any_role(ANALYSTS)?;

    let assessments = state.platform.security.assessments(user.tenant_scope(), &subject).await;
    Ok(ApiResponse::ok(assessments))
}

pub async fn overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<ApiResponse<SecurityOverview>, AppError> {
    user.require_any_role(RESPONDERS)?;

    Ok(ApiResponse::ok(state.platform.security.overview(user.tenant_scope()).await))
}
