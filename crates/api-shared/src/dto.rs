//! Request and response bodies shared by API surfaces.
//!
//! Inputs deliberately omit server-assigned fields (ids, statuses,
//! timestamps); responses reuse the registry records from `opal-types`
//! directly.

use chrono::{DateTime, NaiveDate, Utc};
use opal_types::{Language, RegistrationCodeStatus, RelationshipStatus, RoleType, SexType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Health check response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Machine-readable error body.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub detail: String,
}

/// Body for creating or updating an institution.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct InstitutionInput {
    pub name: String,
    pub acronym: String,
    pub support_email: String,
    /// Age of majority; defaults to 18.
    #[serde(default)]
    pub adulthood_age: Option<u32>,
    /// Registration code validity window in hours; defaults to 72.
    #[serde(default)]
    pub registration_code_valid_period_hours: Option<u32>,
}

/// Body for creating or updating a site.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SiteInput {
    pub institution_id: Uuid,
    pub name: String,
    pub acronym: String,
    pub parking_url: String,
    pub direction_url: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// One hospital identifier inside a patient body.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HospitalIdentifierInput {
    pub site_id: Uuid,
    pub mrn: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Body for creating or updating a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientInput {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    #[serde(default)]
    pub date_of_death: Option<DateTime<Utc>>,
    pub sex: SexType,
    #[serde(default)]
    pub ramq: Option<String>,
    #[serde(default)]
    pub legacy_id: Option<u32>,
    #[serde(default)]
    pub hospital_identifiers: Vec<HospitalIdentifierInput>,
}

/// Body for creating or updating a caregiver profile.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CaregiverInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub language: Language,
    #[serde(default)]
    pub legacy_id: Option<u32>,
}

/// Body for creating or updating a relationship type.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RelationshipTypeInput {
    pub name: String,
    pub description: String,
    pub role: RoleType,
    pub start_age: u32,
    #[serde(default)]
    pub end_age: Option<u32>,
    pub form_required: bool,
    pub can_answer_questionnaire: bool,
    pub can_be_self_granted: bool,
}

/// Body for requesting a new caregiver-patient relationship.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RelationshipRequest {
    pub patient_id: Uuid,
    pub caregiver_id: Uuid,
    pub type_id: Uuid,
    /// Defaults to today.
    #[serde(default)]
    pub request_date: Option<NaiveDate>,
    /// Defaults to the request date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Defaults to the day the patient reaches the type's end age, when the
    /// type has one.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Administrator-granted relationships may be confirmed immediately.
    #[serde(default)]
    pub confirm: bool,
}

/// Reason body for deny/revoke actions.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusReasonReq {
    pub reason: String,
}

/// Body carrying an email verification code.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct VerificationReq {
    pub email_verification_code: String,
}

/// Successful access evaluation for a caregiver against a patient.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessRes {
    pub patient_id: Uuid,
    pub caregiver_username: String,
    /// Confirmed relationships granting the access.
    pub relationship_ids: Vec<Uuid>,
    pub can_answer_questionnaires: bool,
}

/// Pending registration details returned to the companion app.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationDetailsRes {
    pub code: String,
    pub status: RegistrationCodeStatus,
    pub patient_first_name: String,
    pub patient_last_name: String,
    pub relationship_type: String,
    pub institution_name: Option<String>,
}

/// Outcome of completing a registration.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegistrationResultRes {
    pub code_status: RegistrationCodeStatus,
    pub relationship_id: Uuid,
    pub relationship_status: RelationshipStatus,
}
