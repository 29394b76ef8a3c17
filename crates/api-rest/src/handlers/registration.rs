//! Caregiver-facing registration endpoints.
//!
//! These are driven by the companion app, keyed by the registration code
//! itself rather than an account header: the caregiver may not have an
//! account yet when they start registering.

use crate::error::ApiError;
use crate::state::AppState;
use api_shared::{ErrorRes, RegistrationDetailsRes, RegistrationResultRes, VerificationReq};
use axum::extract::{Path, State};
use axum::Json;

#[utoipa::path(
    get,
    path = "/registration/{code}",
    params(("code" = String, Path, description = "Registration code")),
    responses(
        (status = 200, description = "Pending registration details", body = RegistrationDetailsRes),
        (status = 404, description = "Unknown code", body = ErrorRes),
        (status = 409, description = "Code expired, blocked or consumed", body = ErrorRes)
    )
)]
/// Details shown to the caregiver before they verify their email address.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RegistrationDetailsRes>, ApiError> {
    Ok(Json(state.registration.retrieve(&code, chrono::Utc::now())?))
}

#[utoipa::path(
    post,
    path = "/registration/{code}/verify",
    params(("code" = String, Path, description = "Registration code")),
    request_body = VerificationReq,
    responses(
        (status = 204, description = "Verification code accepted"),
        (status = 400, description = "Verification mismatch", body = ErrorRes),
        (status = 409, description = "Code expired or blocked", body = ErrorRes)
    )
)]
/// Checks the 6-digit code sent to the caregiver's email address.
pub async fn verify(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<VerificationReq>,
) -> Result<axum::http::StatusCode, ApiError> {
    state
        .registration
        .verify(&code, &body.email_verification_code, chrono::Utc::now())?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/registration/{code}/register",
    params(("code" = String, Path, description = "Registration code")),
    request_body = VerificationReq,
    responses(
        (status = 200, description = "Registration completed", body = RegistrationResultRes),
        (status = 400, description = "Verification mismatch", body = ErrorRes),
        (status = 409, description = "Code expired, blocked or consumed", body = ErrorRes)
    )
)]
/// Completes the registration; self relationships are confirmed immediately.
pub async fn register(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Json(body): Json<VerificationReq>,
) -> Result<Json<RegistrationResultRes>, ApiError> {
    let (registration_code, relationship) = state.registration.register(
        &code,
        &body.email_verification_code,
        chrono::Utc::now(),
    )?;
    Ok(Json(RegistrationResultRes {
        code_status: registration_code.status,
        relationship_id: relationship.id,
        relationship_status: relationship.status,
    }))
}
