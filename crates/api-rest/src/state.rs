//! Shared handler state and header helpers.

use crate::error::ApiError;
use api_shared::auth;
use axum::http::HeaderMap;
use opal_core::{
    Author, CaregiverService, HospitalService, PatientService, RegistrationService, Registry,
    RelationshipService, RelationshipTypeService,
};

/// Application state shared across REST API handlers.
///
/// Holds one instance of each repository service plus the configured admin
/// API key.
#[derive(Clone)]
pub struct AppState {
    registry: Registry,
    pub hospital: HospitalService,
    pub patients: PatientService,
    pub caregivers: CaregiverService,
    pub relationship_types: RelationshipTypeService,
    pub relationships: RelationshipService,
    pub registration: RegistrationService,
    api_key: Option<String>,
}

impl AppState {
    pub fn new(registry: Registry, api_key: Option<String>) -> Self {
        Self {
            hospital: HospitalService::new(registry.clone()),
            patients: PatientService::new(registry.clone()),
            caregivers: CaregiverService::new(registry.clone()),
            relationship_types: RelationshipTypeService::new(registry.clone()),
            relationships: RelationshipService::new(registry.clone()),
            registration: RegistrationService::new(registry.clone()),
            registry,
            api_key,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Rejects the request unless it carries the configured admin API key.
    pub fn require_api_key(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        auth::validate_api_key(header_str(headers, "x-api-key"), self.api_key.as_deref())
            .map_err(ApiError::Auth)
    }

    /// The audit author for a mutating request.
    ///
    /// Taken from the `x-author-name`/`x-author-email` headers; requests
    /// without them are committed as the system author.
    pub fn author(&self, headers: &HeaderMap) -> Result<Author, ApiError> {
        match (
            header_str(headers, "x-author-name"),
            header_str(headers, "x-author-email"),
        ) {
            (Some(name), Some(email)) => {
                Author::new(name, email).ok_or(ApiError::InvalidAuthor)
            }
            (None, None) => Ok(self.registry.cfg().system_author().clone()),
            _ => Err(ApiError::InvalidAuthor),
        }
    }
}

/// The caregiver account making a caregiver-facing request.
pub fn app_user(headers: &HeaderMap) -> Result<String, ApiError> {
    header_str(headers, "appuserid")
        .map(str::to_owned)
        .ok_or(ApiError::MissingAppUser)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
