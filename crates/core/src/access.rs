//! Request-time access control.
//!
//! Every caregiver request to patient data is evaluated here against the
//! current registry state; nothing is cached, so a revocation takes effect on
//! the next request. The caller identifies the caregiver account through the
//! `Appuserid` header value (the caregiver `username`).

use crate::store::RecordKind;
use crate::{AdminResult, Registry};
use chrono::NaiveDate;
use opal_types::{
    CaregiverProfile, Patient, Relationship, RelationshipStatus, RelationshipType,
};
use uuid::Uuid;

/// A positive access decision and the relationships supporting it.
#[derive(Clone, Debug, PartialEq)]
pub struct AccessGrant {
    /// Confirmed relationships granting the access.
    pub relationship_ids: Vec<Uuid>,
    /// True when at least one granting relationship type allows answering
    /// questionnaires on the patient's behalf.
    pub can_answer_questionnaires: bool,
}

/// Why access was denied.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AccessDenial {
    CaregiverNotFound,
    NoRelationship,
    NotConfirmed,
}

impl AccessDenial {
    /// Message returned to the calling application.
    pub fn detail(self) -> &'static str {
        match self {
            Self::CaregiverNotFound => "Caregiver does not exist.",
            Self::NoRelationship => {
                "Caregiver does not have a relationship with the patient."
            }
            Self::NotConfirmed => {
                "Caregiver has a relationship with the patient, \
                 but its status is not confirmed."
            }
        }
    }
}

/// Outcome of an access evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessDecision {
    Granted(AccessGrant),
    Denied(AccessDenial),
}

/// Returns true if this relationship currently grants access to the patient.
///
/// Access requires a confirmed status, an end date that has not passed, and a
/// patient age still below the type's end age. The daily sweep eventually
/// expires relationships that fail the last two checks; evaluating them here
/// too closes the window between the bound lapsing and the next sweep run.
pub fn relationship_grants_access(
    relationship: &Relationship,
    relationship_type: &RelationshipType,
    patient: &Patient,
    today: NaiveDate,
) -> bool {
    if relationship.status != RelationshipStatus::Confirmed {
        return false;
    }
    if relationship.end_date.is_some_and(|end| end < today) {
        return false;
    }
    relationship_type
        .end_age
        .map_or(true, |end_age| patient.age_on(today) < end_age)
}

/// Evaluates whether the caregiver account may access the patient's data.
///
/// # Errors
///
/// Returns `AdminError::NotFound` when the patient does not exist; unknown
/// caregivers yield a denial rather than an error so the response does not
/// reveal whether an account exists.
pub fn evaluate_patient_access(
    registry: &Registry,
    username: &str,
    patient_id: Uuid,
    today: NaiveDate,
) -> AdminResult<AccessDecision> {
    let patient: Patient = registry.require(RecordKind::Patient, patient_id)?;

    let caregivers: Vec<CaregiverProfile> = registry.list(RecordKind::Caregiver)?;
    let Some(caregiver) = caregivers
        .into_iter()
        .find(|caregiver| caregiver.username == username)
    else {
        return Ok(AccessDecision::Denied(AccessDenial::CaregiverNotFound));
    };

    let relationships: Vec<Relationship> = registry
        .list::<Relationship>(RecordKind::Relationship)?
        .into_iter()
        .filter(|relationship| {
            relationship.patient_id == patient_id && relationship.caregiver_id == caregiver.id
        })
        .collect();
    if relationships.is_empty() {
        return Ok(AccessDecision::Denied(AccessDenial::NoRelationship));
    }

    let mut relationship_ids = Vec::new();
    let mut can_answer_questionnaires = false;
    for relationship in &relationships {
        let Some(relationship_type) = registry
            .load::<RelationshipType>(RecordKind::RelationshipType, relationship.type_id)?
        else {
            continue;
        };
        if relationship_grants_access(relationship, &relationship_type, &patient, today) {
            relationship_ids.push(relationship.id);
            can_answer_questionnaires |= relationship_type.can_answer_questionnaire;
        }
    }

    if relationship_ids.is_empty() {
        return Ok(AccessDecision::Denied(AccessDenial::NotConfirmed));
    }

    Ok(AccessDecision::Granted(AccessGrant {
        relationship_ids,
        can_answer_questionnaires,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        CaregiverService, PatientService, RelationshipService, RelationshipTypeService,
    };
    use crate::{Author, CoreConfig};
    use api_shared::{CaregiverInput, PatientInput, RelationshipRequest};
    use opal_types::{Language, SexType};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        registry: Registry,
        author: Author,
        relationships: RelationshipService,
        patient_id: Uuid,
        guardian_type_id: Uuid,
        caregiver_id: Uuid,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture(temp: &TempDir) -> Fixture {
        let cfg = Arc::new(CoreConfig::new(temp.path().to_path_buf()).unwrap());
        let registry = Registry::open(cfg).unwrap();
        let author = Author::new("Test Admin", "admin@hospital.example").unwrap();

        let patient = PatientService::new(registry.clone())
            .create(
                &author,
                PatientInput {
                    first_name: "Lisa".into(),
                    last_name: "Simpson".into(),
                    date_of_birth: date(2016, 5, 9),
                    date_of_death: None,
                    sex: SexType::Female,
                    ramq: None,
                    legacy_id: None,
                    hospital_identifiers: Vec::new(),
                },
            )
            .unwrap();

        let caregiver = CaregiverService::new(registry.clone())
            .create(
                &author,
                CaregiverInput {
                    username: "homer".into(),
                    first_name: "Homer".into(),
                    last_name: "Simpson".into(),
                    email: "homer@example.com".into(),
                    language: Language::English,
                    legacy_id: None,
                },
            )
            .unwrap();

        let seeded = RelationshipTypeService::new(registry.clone())
            .seed_defaults(&author)
            .unwrap();
        let guardian_type_id = seeded
            .iter()
            .find(|relationship_type| relationship_type.name == "Parent/Guardian")
            .unwrap()
            .id;

        Fixture {
            relationships: RelationshipService::new(registry.clone()),
            registry,
            author,
            patient_id: patient.id,
            guardian_type_id,
            caregiver_id: caregiver.id,
        }
    }

    fn request(fx: &Fixture, confirm: bool) -> RelationshipRequest {
        RelationshipRequest {
            patient_id: fx.patient_id,
            caregiver_id: fx.caregiver_id,
            type_id: fx.guardian_type_id,
            request_date: None,
            start_date: None,
            end_date: None,
            confirm,
        }
    }

    #[test]
    fn unknown_caregiver_is_denied() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let decision =
            evaluate_patient_access(&fx.registry, "nobody", fx.patient_id, date(2024, 6, 1))
                .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Denied(AccessDenial::CaregiverNotFound)
        );
    }

    #[test]
    fn caregiver_without_relationship_is_denied() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let decision =
            evaluate_patient_access(&fx.registry, "homer", fx.patient_id, date(2024, 6, 1))
                .unwrap();
        assert_eq!(
            decision,
            AccessDecision::Denied(AccessDenial::NoRelationship)
        );
    }

    #[test]
    fn pending_relationship_is_denied_as_not_confirmed() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        fx.relationships
            .request(&fx.author, request(&fx, false), today)
            .unwrap();
        let decision =
            evaluate_patient_access(&fx.registry, "homer", fx.patient_id, today).unwrap();
        assert_eq!(decision, AccessDecision::Denied(AccessDenial::NotConfirmed));
    }

    #[test]
    fn confirmed_relationship_grants_access() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        let relationship = fx
            .relationships
            .request(&fx.author, request(&fx, true), today)
            .unwrap();
        let decision =
            evaluate_patient_access(&fx.registry, "homer", fx.patient_id, today).unwrap();
        match decision {
            AccessDecision::Granted(grant) => {
                assert_eq!(grant.relationship_ids, vec![relationship.id]);
                assert!(grant.can_answer_questionnaires);
            }
            AccessDecision::Denied(denial) => panic!("expected a grant, got {denial:?}"),
        }
    }

    #[test]
    fn revoked_relationship_no_longer_grants_access() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        let relationship = fx
            .relationships
            .request(&fx.author, request(&fx, true), today)
            .unwrap();
        fx.relationships
            .revoke(&fx.author, relationship.id, "caregiver request")
            .unwrap();

        let decision =
            evaluate_patient_access(&fx.registry, "homer", fx.patient_id, today).unwrap();
        assert_eq!(decision, AccessDecision::Denied(AccessDenial::NotConfirmed));
    }

    #[test]
    fn access_lapses_once_the_patient_outgrows_the_type() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let relationship = fx
            .relationships
            .request(&fx.author, request(&fx, true), date(2024, 6, 1))
            .unwrap();
        assert!(relationship.status == RelationshipStatus::Confirmed);

        // Lisa turns 14 on 2030-05-09; the sweep has not run yet.
        let decision =
            evaluate_patient_access(&fx.registry, "homer", fx.patient_id, date(2030, 5, 9))
                .unwrap();
        assert_eq!(decision, AccessDecision::Denied(AccessDenial::NotConfirmed));
    }

    #[test]
    fn unknown_patient_is_an_error() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let err =
            evaluate_patient_access(&fx.registry, "homer", Uuid::new_v4(), date(2024, 6, 1))
                .expect_err("unknown patient should fail");
        assert!(matches!(err, crate::AdminError::NotFound { .. }));
    }
}
