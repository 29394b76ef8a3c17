use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, RelationshipRequest, StatusReasonReq};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use opal_core::RelationshipFilter;
use opal_types::{RegistrationCode, Relationship, RelationshipStatus};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RelationshipListQuery {
    pub patient_id: Option<Uuid>,
    pub caregiver_id: Option<Uuid>,
    /// Status code (`PEN`, `CON`, `DEN`, `EXP`, `REV`).
    pub status: Option<RelationshipStatus>,
}

#[utoipa::path(
    get,
    path = "/relationships",
    params(RelationshipListQuery),
    responses(
        (status = 200, description = "Matching relationships", body = [Relationship])
    )
)]
/// Lists relationships, optionally filtered by patient, caregiver or status.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<RelationshipListQuery>,
) -> Result<Json<Vec<Relationship>>, ApiError> {
    let filter = RelationshipFilter {
        patient_id: query.patient_id,
        caregiver_id: query.caregiver_id,
        status: query.status,
    };
    Ok(Json(state.relationships.list(filter)?))
}

#[utoipa::path(
    post,
    path = "/relationships",
    request_body = RelationshipRequest,
    responses(
        (status = 201, description = "Relationship requested", body = Relationship),
        (status = 400, description = "Deceased patient or age outside window", body = ErrorRes),
        (status = 409, description = "Duplicate active relationship", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
/// Requests a new caregiver-patient relationship.
///
/// Administrators may pass `confirm: true` to approve it in the same step.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RelationshipRequest>,
) -> Result<(StatusCode, Json<Relationship>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let today = chrono::Utc::now().date_naive();
    let relationship = state.relationships.request(&author, request, today)?;
    Ok((StatusCode::CREATED, Json(relationship)))
}

#[utoipa::path(
    get,
    path = "/relationships/{id}",
    params(("id" = Uuid, Path, description = "Relationship id")),
    responses(
        (status = 200, description = "Relationship", body = Relationship),
        (status = 404, description = "Unknown relationship", body = ErrorRes)
    )
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Relationship>, ApiError> {
    Ok(Json(state.relationships.get(id)?))
}

#[utoipa::path(
    post,
    path = "/relationships/{id}/confirm",
    params(("id" = Uuid, Path, description = "Relationship id")),
    responses(
        (status = 200, description = "Relationship confirmed", body = Relationship),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Relationship>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.relationships.confirm(&author, id)?))
}

#[utoipa::path(
    post,
    path = "/relationships/{id}/deny",
    params(("id" = Uuid, Path, description = "Relationship id")),
    request_body = StatusReasonReq,
    responses(
        (status = 200, description = "Relationship denied", body = Relationship),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn deny(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusReasonReq>,
) -> Result<Json<Relationship>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.relationships.deny(&author, id, &body.reason)?))
}

#[utoipa::path(
    post,
    path = "/relationships/{id}/revoke",
    params(("id" = Uuid, Path, description = "Relationship id")),
    request_body = StatusReasonReq,
    responses(
        (status = 200, description = "Relationship revoked", body = Relationship),
        (status = 400, description = "Missing reason", body = ErrorRes),
        (status = 409, description = "Invalid status transition", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
pub async fn revoke(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(body): Json<StatusReasonReq>,
) -> Result<Json<Relationship>, ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    Ok(Json(state.relationships.revoke(&author, id, &body.reason)?))
}

#[utoipa::path(
    post,
    path = "/relationships/{id}/registration-codes",
    params(("id" = Uuid, Path, description = "Relationship id")),
    responses(
        (status = 201, description = "Registration code issued", body = RegistrationCode),
        (status = 409, description = "Relationship not pending", body = ErrorRes)
    ),
    security(("api_key" = []))
)]
/// Issues a registration code for a pending relationship.
pub async fn issue_code(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<RegistrationCode>), ApiError> {
    state.require_api_key(&headers)?;
    let author = state.author(&headers)?;
    let code = state.registration.issue(&author, id, chrono::Utc::now())?;
    Ok((StatusCode::CREATED, Json(code)))
}
