use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, SiteInput};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use opal_types::Site;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/sites",
    responses(
        (status = 200, description = "List of sites", body = [Site])
    )
)]
/// Lists all sites, ordered by name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.hospital.list_sites()?))
}

#[utoipa::path(
    post,
    path = "/sites",
    request_body = SiteInput,
    responses(
        (status = 201, description = "Site created", body = Site),
        (status = 404, description = "Unknown institution", body = ErrorRes),
        (status = 409, description = "Duplicate acronym", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<SiteInput>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let site = state.hospital.create_site(&author, input)?;
    Ok((StatusCode::CREATED, Json(site)))
}

#[utoipa::path(
    get,
    path = "/sites/{id}",
    params(("id" = Uuid, Path, description = "Site id")),
    responses(
        (status = 200, description = "Site", body = Site),
        (status = 404, description = "Unknown site", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Site>, ApiError> {
    Ok(Json(state.hospital.get_site(id)?))
}

#[utoipa::path(
    put,
    path = "/sites/{id}",
    params(("id" = Uuid, Path, description = "Site id")),
    request_body = SiteInput,
    responses(
        (status = 200, description = "Site updated", body = Site),
        (status = 404, description = "Unknown site", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<SiteInput>,
) -> Result<Json<Site>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.hospital.update_site(&author, id, input)?))
}

#[utoipa::path(
    delete,
    path = "/sites/{id}",
    params(("id" = Uuid, Path, description = "Site id")),
    responses(
        (status = 204, description = "Site deleted"),
        (status = 409, description = "Site referenced by patients", body = ErrorRes)
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
    state.hospital.delete_site(&author, id)?;
    Ok(StatusCode::NO_CONTENT)
}
