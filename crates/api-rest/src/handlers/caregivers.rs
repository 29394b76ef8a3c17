use crate::error::ApiError;
use crate::state::{app_user, AppState};
use api_shared::{CaregiverInput, ErrorRes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use opal_types::{CaregiverProfile, Patient};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/caregivers",
    responses(
        (status = 200, description = "List of caregivers", body = [CaregiverProfile])
    )
)]
/// Lists all caregiver profiles, ordered by last then first name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CaregiverProfile>>, ApiError> {
    Ok(Json(state.caregivers.list()?))
}

#[utoipa::path(
    post,
    path = "/caregivers",
    request_body = CaregiverInput,
    responses(
        (status = 201, description = "Caregiver created", body = CaregiverProfile),
        (status = 409, description = "Duplicate username", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CaregiverInput>,
) -> Result<(StatusCode, Json<CaregiverProfile>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let caregiver = state.caregivers.create(&author, input)?;
    Ok((StatusCode::CREATED, Json(caregiver)))
}

#[utoipa::path(
    get,
    path = "/caregivers/{id}",
    params(("id" = Uuid, Path, description = "Caregiver id")),
    responses(
        (status = 200, description = "Caregiver", body = CaregiverProfile),
        (status = 404, description = "Unknown caregiver", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaregiverProfile>, ApiError> {
    Ok(Json(state.caregivers.get(id)?))
}

#[utoipa::path(
    put,
    path = "/caregivers/{id}",
    params(("id" = Uuid, Path, description = "Caregiver id")),
    request_body = CaregiverInput,
    responses(
        (status = 200, description = "Caregiver updated", body = CaregiverProfile),
        (status = 404, description = "Unknown caregiver", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<CaregiverInput>,
) -> Result<Json<CaregiverProfile>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.caregivers.update(&author, id, input)?))
}

#[utoipa::path(
    get,
    path = "/caregivers/{id}/patients",
    params(("id" = String, Path, description = "Caregiver username")),
    responses(
        (status = 200, description = "Patients the caregiver can access", body = [Patient]),
        (status = 403, description = "Appuserid does not match the username", body = ErrorRes)
    )
)]
/// Patients the calling caregiver currently has confirmed access to.
///
/// Caregiver-facing: the `Appuserid` header must match the username in the
/// path, so one account cannot enumerate another's patients.
pub async fn patients(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let caller = app_user(&headers)?;
    if caller != username {
        return Err(ApiError::AccessDenied(
            "Appuserid does not match the requested caregiver.",
        ));
    }

    let today = chrono::Utc::now().date_naive();
    Ok(Json(
        state.relationships.patients_for_caregiver(&username, today)?,
    ))
}
