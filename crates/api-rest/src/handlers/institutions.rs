use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, InstitutionInput};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use opal_types::Institution;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/institutions",
    responses(
        (status = 200, description = "List of institutions", body = [Institution])
    )
)]
/// Lists all institutions, ordered by name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Institution>>, ApiError> {
    Ok(Json(state.hospital.list_institutions()?))
}

#[utoipa::path(
    post,
    path = "/institutions",
    request_body = InstitutionInput,
    responses(
        (status = 201, description = "Institution created", body = Institution),
        (status = 400, description = "Invalid input", body = ErrorRes),
        (status = 409, description = "Duplicate acronym", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
/// Creates a new institution.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<InstitutionInput>,
) -> Result<(StatusCode, Json<Institution>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let institution = state.hospital.create_institution(&author, input)?;
    Ok((StatusCode::CREATED, Json(institution)))
}

#[utoipa::path(
    get,
    path = "/institutions/{id}",
    params(("id" = Uuid, Path, description = "Institution id")),
    responses(
        (status = 200, description = "Institution", body = Institution),
        (status = 404, description = "Unknown institution", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Institution>, ApiError> {
    Ok(Json(state.hospital.get_institution(id)?))
}

#[utoipa::path(
    put,
    path = "/institutions/{id}",
    params(("id" = Uuid, Path, description = "Institution id")),
    request_body = InstitutionInput,
    responses(
        (status = 200, description = "Institution updated", body = Institution),
        (status = 404, description = "Unknown institution", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<InstitutionInput>,
) -> Result<Json<Institution>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.hospital.update_institution(&author, id, input)?))
}

#[utoipa::path(
    delete,
    path = "/institutions/{id}",
    params(("id" = Uuid, Path, description = "Institution id")),
    responses(
        (status = 204, description = "Institution deleted"),
        (status = 409, description = "Institution still has sites", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    state.hospital.delete_institution(&author, id)?;
    Ok(StatusCode::NO_CONTENT)
}
