//! Domain records managed by the opaladmin registry.
//!
//! These are the persisted shapes: each struct maps one-to-one onto a JSON
//! file in the registry. Construction-time validation that spans multiple
//! records (uniqueness, referential checks) lives in `opal_core`; per-field
//! shape validation lives here or in `opal_core::validation`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::status::{RegistrationCodeStatus, RelationshipStatus};

/// A hospital institution, the top of the hospital-settings hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    /// Short unique code, e.g. "MUHC".
    pub acronym: String,
    pub support_email: String,
    /// Age of majority; controls pediatric handling such as delayed result
    /// sharing and guardian relationship windows.
    pub adulthood_age: u32,
    /// Hours a registration code stays usable after issuance.
    pub registration_code_valid_period_hours: u32,
}

/// A physical site belonging to an [`Institution`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Site {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    /// Short unique code, e.g. "MGH".
    pub acronym: String,
    pub parking_url: String,
    pub direction_url: String,
    pub longitude: f64,
    pub latitude: f64,
}

/// The choice of sex types.
///
/// The values are the raw values as they are retrieved in HL7.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum SexType {
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "O")]
    Other,
    #[serde(rename = "U")]
    Unknown,
}

/// A hospital-issued identifier for a patient at one site.
///
/// The `(site_id, mrn)` pair is unique across all patients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HospitalIdentifier {
    pub site_id: Uuid,
    /// Medical record number at that site.
    pub mrn: String,
    pub is_active: bool,
}

/// A patient whose data can be accessed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Set when the patient is deceased. Must not precede `date_of_birth`.
    #[serde(default)]
    pub date_of_death: Option<DateTime<Utc>>,
    pub sex: SexType,
    /// Provincial health insurance number (4 letters + 8 digits), unique
    /// when present.
    #[serde(default)]
    pub ramq: Option<String>,
    /// Identifier of this patient in the legacy database.
    #[serde(default)]
    pub legacy_id: Option<u32>,
    #[serde(default)]
    pub hospital_identifiers: Vec<HospitalIdentifier>,
}

impl Patient {
    /// Calendar age of the patient on the given date.
    ///
    /// Counts completed years, i.e. the age only increments once the
    /// birthday has passed.
    pub fn age_on(&self, on: NaiveDate) -> u32 {
        calculate_age(self.date_of_birth, on)
    }

    pub fn is_deceased(&self) -> bool {
        self.date_of_death.is_some()
    }
}

/// Calendar age in completed years between `date_of_birth` and `on`.
///
/// Returns 0 when `on` precedes the date of birth.
pub fn calculate_age(date_of_birth: NaiveDate, on: NaiveDate) -> u32 {
    use chrono::Datelike;

    if on <= date_of_birth {
        return 0;
    }

    let mut age = on.year() - date_of_birth.year();
    if (on.month(), on.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Interface language of a caregiver account.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "fr")]
    French,
}

/// An account capable of being granted access to patients' data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CaregiverProfile {
    pub id: Uuid,
    /// Account identifier used by the companion applications (the
    /// `Appuserid` request header carries this value).
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub language: Language,
    /// Identifier of this caregiver in the legacy database.
    #[serde(default)]
    pub legacy_id: Option<u32>,
}

/// The role a relationship type represents.
///
/// Predefined roles carry special handling (`Self_` uniqueness, automatic
/// confirmation on self-registration); free-form types use `Caregiver`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum RoleType {
    /// The patient is their own caregiver.
    #[serde(rename = "SELF")]
    Self_,
    #[serde(rename = "PARENT_GUARDIAN")]
    ParentGuardian,
    #[serde(rename = "GUARDIAN_CAREGIVER")]
    GuardianCaregiver,
    #[serde(rename = "MANDATARY")]
    Mandatary,
    #[serde(rename = "CAREGIVER")]
    Caregiver,
}

/// A type of relationship between a caregiver and a patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RelationshipType {
    pub id: Uuid,
    /// Unique display name, e.g. "Parent/Guardian".
    pub name: String,
    pub description: String,
    pub role: RoleType,
    /// Minimum patient age at which the relationship is allowed to start.
    pub start_age: u32,
    /// Patient age at which relationships of this type end automatically.
    #[serde(default)]
    pub end_age: Option<u32>,
    /// Whether the hospital consent form must be completed by the caregiver.
    pub form_required: bool,
    /// The caregiver can answer questionnaires on behalf of the patient.
    pub can_answer_questionnaire: bool,
    /// Whether a caregiver may request this type through the registration
    /// workflow without administrator initiation.
    pub can_be_self_granted: bool,
}

impl RelationshipType {
    /// Returns true if a patient of the given age falls inside this type's
    /// authorised age window `[start_age, end_age)`.
    pub fn covers_age(&self, age: u32) -> bool {
        age >= self.start_age && self.end_age.map_or(true, |end| age < end)
    }
}

/// Association record linking one caregiver to one patient through a
/// relationship type.
///
/// Relationships are never deleted; terminal rows are retained for audit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Relationship {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub caregiver_id: Uuid,
    pub type_id: Uuid,
    pub status: RelationshipStatus,
    /// Reason for the last status change; mandatory when denying or
    /// revoking.
    #[serde(default)]
    pub reason: String,
    pub request_date: NaiveDate,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// One-time code allowing a caregiver to self-register and complete an
/// initial relationship.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RegistrationCode {
    pub id: Uuid,
    pub relationship_id: Uuid,
    /// 12-character registration code handed to the caregiver.
    pub code: String,
    pub status: RegistrationCodeStatus,
    pub created_at: DateTime<Utc>,
    /// Failed email-verification attempts so far.
    pub attempts: u32,
    /// 6-digit code sent to the caregiver's email address.
    pub email_verification_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn birth(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_increments_only_after_birthday() {
        let dob = birth(2010, 6, 15);
        assert_eq!(calculate_age(dob, birth(2024, 6, 14)), 13);
        assert_eq!(calculate_age(dob, birth(2024, 6, 15)), 14);
        assert_eq!(calculate_age(dob, birth(2024, 6, 16)), 14);
    }

    #[test]
    fn age_is_zero_before_birth() {
        let dob = birth(2030, 1, 1);
        assert_eq!(calculate_age(dob, birth(2024, 1, 1)), 0);
    }

    #[test]
    fn age_handles_leap_day_birthdays() {
        let dob = birth(2008, 2, 29);
        // On Feb 28 of a non-leap year the birthday has not passed yet.
        assert_eq!(calculate_age(dob, birth(2023, 2, 28)), 14);
        assert_eq!(calculate_age(dob, birth(2023, 3, 1)), 15);
    }

    #[test]
    fn type_age_window_is_half_open() {
        let guardian = RelationshipType {
            id: Uuid::new_v4(),
            name: "Parent/Guardian".into(),
            description: "A parent or legal guardian".into(),
            role: RoleType::ParentGuardian,
            start_age: 0,
            end_age: Some(14),
            form_required: true,
            can_answer_questionnaire: true,
            can_be_self_granted: false,
        };

        assert!(guardian.covers_age(0));
        assert!(guardian.covers_age(13));
        assert!(!guardian.covers_age(14));
    }

    #[test]
    fn open_ended_type_covers_all_ages_above_start() {
        let mandatary = RelationshipType {
            id: Uuid::new_v4(),
            name: "Mandatary".into(),
            description: "Court-appointed mandatary".into(),
            role: RoleType::Mandatary,
            start_age: 0,
            end_age: None,
            form_required: true,
            can_answer_questionnaire: false,
            can_be_self_granted: false,
        };

        assert!(mandatary.covers_age(0));
        assert!(mandatary.covers_age(149));
    }

    #[test]
    fn sex_type_uses_hl7_raw_values() {
        assert_eq!(serde_json::to_string(&SexType::Female).unwrap(), "\"F\"");
        assert_eq!(serde_json::to_string(&SexType::Unknown).unwrap(), "\"U\"");
    }
}
