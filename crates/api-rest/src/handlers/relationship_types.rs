use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, RelationshipTypeInput};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::NaiveDate;
use opal_types::{records::calculate_age, RelationshipType};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/relationship-types",
    responses(
        (status = 200, description = "List of relationship types", body = [RelationshipType])
    )
)]
/// Lists all relationship types, ordered by name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<RelationshipType>>, ApiError> {
    Ok(Json(state.relationship_types.list()?))
}

#[utoipa::path(
    post,
    path = "/relationship-types",
    request_body = RelationshipTypeInput,
    responses(
        (status = 201, description = "Relationship type created", body = RelationshipType),
        (status = 400, description = "Invalid age window", body = ErrorRes),
        (status = 409, description = "Duplicate name or second SELF type", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RelationshipTypeInput>,
) -> Result<(StatusCode, Json<RelationshipType>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let relationship_type = state.relationship_types.create(&author, input)?;
    Ok((StatusCode::CREATED, Json(relationship_type)))
}

#[utoipa::path(
    get,
    path = "/relationship-types/{id}",
    params(("id" = Uuid, Path, description = "Relationship type id")),
    responses(
        (status = 200, description = "Relationship type", body = RelationshipType),
        (status = 404, description = "Unknown relationship type", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RelationshipType>, ApiError> {
    Ok(Json(state.relationship_types.get(id)?))
}

#[utoipa::path(
    put,
    path = "/relationship-types/{id}",
    params(("id" = Uuid, Path, description = "Relationship type id")),
    request_body = RelationshipTypeInput,
    responses(
        (status = 200, description = "Relationship type updated", body = RelationshipType),
        (status = 404, description = "Unknown relationship type", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(input): Json<RelationshipTypeInput>,
) -> Result<Json<RelationshipType>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.relationship_types.update(&author, id, input)?))
}

#[utoipa::path(
    delete,
    path = "/relationship-types/{id}",
    params(("id" = Uuid, Path, description = "Relationship type id")),
    responses(
        (status = 204, description = "Relationship type deleted"),
        (status = 409, description = "Type referenced by relationships", body = ErrorRes)
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
    state.relationship_types.delete(&author, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ValidTypesQuery {
    /// Patient date of birth; the age is computed against today.
    pub date_of_birth: NaiveDate,
}

#[utoipa::path(
    get,
    path = "/relationship-types/valid",
    params(ValidTypesQuery),
    responses(
        (status = 200, description = "Types covering the patient's age", body = [RelationshipType])
    )
)]
/// Relationship types a patient of the given date of birth qualifies for.
pub async fn valid(
    State(state): State<AppState>,
    Query(query): Query<ValidTypesQuery>,
) -> Result<Json<Vec<RelationshipType>>, ApiError> {
    let age = calculate_age(query.date_of_birth, chrono::Utc::now().date_naive());
    Ok(Json(state.relationship_types.valid_types_for_age(age)?))
}
