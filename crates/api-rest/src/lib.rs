//! # API REST
//!
//! REST API implementation for opaladmin.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, error mapping)
//!
//! Uses `api-shared` for DTOs and API-key validation, and `opal-core` for
//! all domain logic.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::institutions::list,
        handlers::institutions::create,
        handlers::institutions::get,
        handlers::institutions::update,
        handlers::institutions::delete,
        handlers::sites::list,
        handlers::sites::create,
        handlers::sites::get,
        handlers::sites::update,
        handlers::sites::delete,
        handlers::patients::list,
        handlers::patients::create,
        handlers::patients::get,
        handlers::patients::update,
        handlers::patients::lookup,
        handlers::caregivers::list,
        handlers::caregivers::create,
        handlers::caregivers::get,
        handlers::caregivers::update,
        handlers::caregivers::patients,
        handlers::relationship_types::list,
        handlers::relationship_types::create,
        handlers::relationship_types::get,
        handlers::relationship_types::update,
        handlers::relationship_types::delete,
        handlers::relationship_types::valid,
        handlers::relationships::list,
        handlers::relationships::create,
        handlers::relationships::get,
        handlers::relationships::confirm,
        handlers::relationships::deny,
        handlers::relationships::revoke,
        handlers::relationships::issue_code,
        handlers::registration::retrieve,
        handlers::registration::verify,
        handlers::registration::register,
        handlers::access::patient_access,
    ),
    components(schemas(
        api_shared::HealthRes,
        api_shared::ErrorRes,
        api_shared::InstitutionInput,
        api_shared::SiteInput,
        api_shared::HospitalIdentifierInput,
        api_shared::PatientInput,
        api_shared::CaregiverInput,
        api_shared::RelationshipTypeInput,
        api_shared::RelationshipRequest,
        api_shared::StatusReasonReq,
        api_shared::VerificationReq,
        api_shared::AccessRes,
        api_shared::RegistrationDetailsRes,
        api_shared::RegistrationResultRes,
        opal_types::Institution,
        opal_types::Site,
        opal_types::Patient,
        opal_types::HospitalIdentifier,
        opal_types::CaregiverProfile,
        opal_types::RelationshipType,
        opal_types::Relationship,
        opal_types::RegistrationCode,
        opal_types::SexType,
        opal_types::Language,
        opal_types::RoleType,
        opal_types::RelationshipStatus,
        opal_types::RegistrationCodeStatus,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-api-key"))),
            );
        }
    }
}

/// Builds the opaladmin REST router.
///
/// Swagger UI is mounted by the binary, not here, so router tests stay
/// independent of the embedded UI assets.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/institutions",
            get(handlers::institutions::list).post(handlers::institutions::create),
        )
        .route(
            "/institutions/:id",
            get(handlers::institutions::get)
                .put(handlers::institutions::update)
                .delete(handlers::institutions::delete),
        )
        .route(
            "/sites",
            get(handlers::sites::list).post(handlers::sites::create),
        )
        .route(
            "/sites/:id",
            get(handlers::sites::get)
                .put(handlers::sites::update)
                .delete(handlers::sites::delete),
        )
        .route(
            "/patients",
            get(handlers::patients::list).post(handlers::patients::create),
        )
        .route("/patients/lookup", get(handlers::patients::lookup))
        .route(
            "/patients/:id",
            get(handlers::patients::get).put(handlers::patients::update),
        )
        .route("/patients/:id/access", get(handlers::access::patient_access))
        .route(
            "/caregivers",
            get(handlers::caregivers::list).post(handlers::caregivers::create),
        )
        .route(
            "/caregivers/:id",
            get(handlers::caregivers::get).put(handlers::caregivers::update),
        )
        .route(
            "/caregivers/:id/patients",
            get(handlers::caregivers::patients),
        )
        .route(
            "/relationship-types",
            get(handlers::relationship_types::list).post(handlers::relationship_types::create),
        )
        .route(
            "/relationship-types/valid",
            get(handlers::relationship_types::valid),
        )
        .route(
            "/relationship-types/:id",
            get(handlers::relationship_types::get)
                .put(handlers::relationship_types::update)
                .delete(handlers::relationship_types::delete),
        )
        .route(
            "/relationships",
            get(handlers::relationships::list).post(handlers::relationships::create),
        )
        .route("/relationships/:id", get(handlers::relationships::get))
        .route(
            "/relationships/:id/confirm",
            post(handlers::relationships::confirm),
        )
        .route("/relationships/:id/deny", post(handlers::relationships::deny))
        .route(
            "/relationships/:id/revoke",
            post(handlers::relationships::revoke),
        )
        .route(
            "/relationships/:id/registration-codes",
            post(handlers::relationships::issue_code),
        )
        .route("/registration/:code", get(handlers::registration::retrieve))
        .route(
            "/registration/:code/verify",
            post(handlers::registration::verify),
        )
        .route(
            "/registration/:code/register",
            post(handlers::registration::register),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
