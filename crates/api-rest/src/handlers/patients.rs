use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, PatientInput};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use opal_core::AdminError;
use opal_types::Patient;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/patients",
    responses(
        (status = 200, description = "List of patients", body = [Patient])
    )
)]
/// Lists all patients, ordered by last then first name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.patients.list()?))
}

#[utoipa::path(
    post,
    path = "/patients",
    request_body = PatientInput,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 409, description = "Duplicate RAMQ, legacy id or MRN", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<PatientInput>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let patient = state.patients.create(&author, input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.patients.get(id)?))
}

#[utoipa::path(
    put,
    path = "/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient id")),
    request_body = PatientInput,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 404, description = "Unknown patient", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<PatientInput>,
) -> Result<Json<Patient>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.patients.update(&author, id, input)?))
}

/// Lookup criteria: either `site` + `mrn`, or `ramq`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct LookupQuery {
    /// Site acronym, paired with `mrn`.
    pub site: Option<String>,
    /// Medical record number at the given site.
    pub mrn: Option<String>,
    /// Provincial health insurance number.
    pub ramq: Option<String>,
}

#[utoipa::path(
    get,
    path = "/patients/lookup",
    params(LookupQuery),
    responses(
        (status = 200, description = "Matching patient", body = Patient),
        (status = 400, description = "Missing or conflicting criteria", body = ErrorRes),
        (status = 404, description = "No matching patient", body = ErrorRes)
    )
)]
/// Finds a patient by hospital identifier or by RAMQ.
pub async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<Patient>, ApiError> {
    let patient = match (query.site, query.mrn, query.ramq) {
        (Some(site), Some(mrn), None) => state.patients.find_by_site_mrn(&site, &mrn)?,
        (None, None, Some(ramq)) => state.patients.find_by_ramq(&ramq)?,
        _ => {
            return Err(AdminError::InvalidInput(
                "provide either site and mrn, or ramq".into(),
            )
            .into())
        }
    };
    Ok(Json(patient))
}
