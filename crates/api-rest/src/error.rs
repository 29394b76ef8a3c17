//! Mapping of core errors onto HTTP responses.

use api_shared::auth::AuthError;
use api_shared::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use opal_core::AdminError;

/// Error type returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Admin(AdminError),
    Auth(AuthError),
    /// `x-author-name`/`x-author-email` were inconsistent or invalid.
    InvalidAuthor,
    /// Caregiver-facing endpoint called without an `Appuserid` header.
    MissingAppUser,
    /// Access evaluation denied the request.
    AccessDenied(&'static str),
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        Self::Admin(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::Admin(err) => admin_error_response(err),
            Self::Auth(err) => (StatusCode::UNAUTHORIZED, err.to_string()),
            Self::InvalidAuthor => (
                StatusCode::BAD_REQUEST,
                "x-author-name and x-author-email must be provided together and be valid"
                    .to_string(),
            ),
            Self::MissingAppUser => (
                StatusCode::UNAUTHORIZED,
                "Appuserid header is required".to_string(),
            ),
            Self::AccessDenied(detail) => (StatusCode::FORBIDDEN, detail.to_string()),
        };
        (status, Json(ErrorRes { detail })).into_response()
    }
}

fn admin_error_response(err: AdminError) -> (StatusCode, String) {
    match &err {
        AdminError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        AdminError::Conflict(_)
        | AdminError::InUse(_)
        | AdminError::InvalidTransition { .. }
        | AdminError::CodeNotUsable { .. } => (StatusCode::CONFLICT, err.to_string()),
        AdminError::InvalidInput(_)
        | AdminError::ReasonRequired(_)
        | AdminError::DeceasedPatient
        | AdminError::AgeOutsideTypeWindow { .. }
        | AdminError::VerificationMismatch { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!("internal error: {err:?}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    }
}
