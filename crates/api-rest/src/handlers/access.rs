use crate::error::ApiError;
use crate::state::{app_user, AppState};
use api_shared::{AccessRes, ErrorRes};
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use opal_core::{access, AccessDecision};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/patients/{id}/access",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Access granted", body = AccessRes),
        (status = 403, description = "Access denied", body = ErrorRes),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
/// Evaluates whether the calling caregiver may access the patient's data.
///
/// Evaluated against the current registry state on every call; a revoked
/// relationship takes effect immediately.
pub async fn patient_access(
    State(state): State<AppState>,
    Path(patient_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<AccessRes>, ApiError> {
    let username = app_user(&headers)?;
    let today = chrono::Utc::now().date_naive();

    let decision =
        access::evaluate_patient_access(state.registry(), &username, patient_id, today)?;
    match decision {
        AccessDecision::Granted(grant) => Ok(Json(AccessRes {
            patient_id,
            caregiver_username: username,
            relationship_ids: grant.relationship_ids,
            can_answer_questionnaires: grant.can_answer_questionnaires,
        })),
        AccessDecision::Denied(denial) => Err(ApiError::AccessDenied(denial.detail())),
    }
}
