//! Daily expiry sweep.
//!
//! Confirmed relationships end automatically when their end date passes or
//! the patient reaches the relationship type's end age, and unused
//! registration codes expire after their validity window. The sweep walks the
//! registry and records those transitions with the system author; the access
//! layer applies the same bounds at request time, so the sweep is about
//! keeping the records honest rather than closing a security gap.

use crate::repositories::{RegistrationService, RelationshipService};
use crate::store::RecordKind;
use crate::{AdminResult, Registry};
use chrono::{DateTime, Utc};
use opal_types::{Patient, Relationship, RelationshipStatus, RelationshipType};

/// Counts of records expired by one sweep run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SweepOutcome {
    pub relationships_expired: u32,
    pub codes_expired: u32,
}

/// Runs one expiry sweep over the whole registry.
///
/// # Errors
///
/// Returns the first storage or audit error encountered; records processed
/// before the failure stay expired.
pub fn run_sweep(registry: &Registry, now: DateTime<Utc>) -> AdminResult<SweepOutcome> {
    let today = now.date_naive();
    let relationships = RelationshipService::new(registry.clone());
    let registrations = RegistrationService::new(registry.clone());
    let system = registry.cfg().system_author().clone();

    let mut outcome = SweepOutcome::default();

    let confirmed: Vec<Relationship> = registry
        .list(RecordKind::Relationship)?
        .into_iter()
        .filter(|relationship: &Relationship| {
            relationship.status == RelationshipStatus::Confirmed
        })
        .collect();

    for relationship in confirmed {
        let reason = match relationship.end_date {
            Some(end) if end < today => Some(format!("end date {end} passed")),
            _ => outgrown_reason(registry, &relationship, today)?,
        };

        if let Some(reason) = reason {
            relationships.expire(&system, relationship.id, &reason)?;
            outcome.relationships_expired += 1;
        }
    }

    outcome.codes_expired = registrations.expire_stale_codes(now)?;

    tracing::info!(
        relationships_expired = outcome.relationships_expired,
        codes_expired = outcome.codes_expired,
        "expiry sweep finished"
    );
    Ok(outcome)
}

/// Reason string when the patient has reached the type's end age, or `None`
/// when the relationship is still inside its window.
fn outgrown_reason(
    registry: &Registry,
    relationship: &Relationship,
    today: chrono::NaiveDate,
) -> AdminResult<Option<String>> {
    let Some(relationship_type) = registry
        .load::<RelationshipType>(RecordKind::RelationshipType, relationship.type_id)?
    else {
        return Ok(None);
    };
    let Some(end_age) = relationship_type.end_age else {
        return Ok(None);
    };
    let Some(patient) = registry.load::<Patient>(RecordKind::Patient, relationship.patient_id)?
    else {
        return Ok(None);
    };

    if patient.age_on(today) >= end_age {
        Ok(Some(format!("patient reached the age of {end_age}")))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{
        CaregiverService, PatientService, RelationshipFilter, RelationshipService,
        RelationshipTypeService,
    };
    use crate::{Author, CoreConfig};
    use api_shared::{CaregiverInput, PatientInput, RelationshipRequest};
    use chrono::{NaiveDate, TimeZone};
    use opal_types::{Language, SexType};
    use std::sync::Arc;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        registry: Registry,
        relationships: RelationshipService,
        author: Author,
        patient_id: Uuid,
        caregiver_id: Uuid,
        guardian_type_id: Uuid,
        mandatary_type_id: Uuid,
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at_noon(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap())
    }

    fn fixture(temp: &TempDir) -> Fixture {
        let cfg = Arc::new(CoreConfig::new(temp.path().to_path_buf()).unwrap());
        let registry = Registry::open(cfg).unwrap();
        let author = Author::new("Test Admin", "admin@hospital.example").unwrap();

        let patient = PatientService::new(registry.clone())
            .create(
                &author,
                PatientInput {
                    first_name: "Bart".into(),
                    last_name: "Simpson".into(),
                    date_of_birth: date(2014, 2, 23),
                    date_of_death: None,
                    sex: SexType::Male,
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
                    username: "marge".into(),
                    first_name: "Marge".into(),
                    last_name: "Simpson".into(),
                    email: "marge@example.com".into(),
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
        let mandatary_type_id = seeded
            .iter()
            .find(|relationship_type| relationship_type.name == "Mandatary")
            .unwrap()
            .id;

        Fixture {
            relationships: RelationshipService::new(registry.clone()),
            registry,
            author,
            patient_id: patient.id,
            caregiver_id: caregiver.id,
            guardian_type_id,
            mandatary_type_id,
        }
    }

    fn confirmed_relationship(
        fx: &Fixture,
        type_id: Uuid,
        today: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Relationship {
        fx.relationships
            .request(
                &fx.author,
                RelationshipRequest {
                    patient_id: fx.patient_id,
                    caregiver_id: fx.caregiver_id,
                    type_id,
                    request_date: None,
                    start_date: None,
                    end_date,
                    confirm: true,
                },
                today,
            )
            .unwrap()
    }

    #[test]
    fn sweep_expires_relationships_past_their_end_date() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let relationship = confirmed_relationship(
            &fx,
            fx.mandatary_type_id,
            date(2024, 6, 1),
            Some(date(2024, 7, 1)),
        );

        let outcome = run_sweep(&fx.registry, at_noon(date(2024, 7, 2))).unwrap();
        assert_eq!(outcome.relationships_expired, 1);

        let expired = fx.relationships.get(relationship.id).unwrap();
        assert_eq!(expired.status, RelationshipStatus::Expired);
        assert_eq!(expired.reason, "end date 2024-07-01 passed");
    }

    #[test]
    fn sweep_expires_relationships_once_the_patient_outgrows_the_type() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        // Guardian window ends at age 14; Bart turns 14 on 2028-02-23.
        let relationship = confirmed_relationship(
            &fx,
            fx.guardian_type_id,
            date(2024, 6, 1),
            Some(date(2030, 1, 1)),
        );

        let outcome = run_sweep(&fx.registry, at_noon(date(2028, 2, 23))).unwrap();
        assert_eq!(outcome.relationships_expired, 1);

        let expired = fx.relationships.get(relationship.id).unwrap();
        assert_eq!(expired.reason, "patient reached the age of 14");
    }

    #[test]
    fn sweep_leaves_current_relationships_alone() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        confirmed_relationship(&fx, fx.guardian_type_id, today, None);
        // A pending request never expires, whatever its dates say.
        fx.relationships
            .request(
                &fx.author,
                RelationshipRequest {
                    patient_id: fx.patient_id,
                    caregiver_id: fx.caregiver_id,
                    type_id: fx.mandatary_type_id,
                    request_date: None,
                    start_date: None,
                    end_date: Some(date(2024, 6, 15)),
                    confirm: false,
                },
                today,
            )
            .unwrap();

        let outcome = run_sweep(&fx.registry, at_noon(date(2024, 6, 20))).unwrap();
        assert_eq!(outcome.relationships_expired, 0);

        let pending = fx
            .relationships
            .list(RelationshipFilter {
                status: Some(RelationshipStatus::Pending),
                ..RelationshipFilter::default()
            })
            .unwrap();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn sweep_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        confirmed_relationship(
            &fx,
            fx.mandatary_type_id,
            date(2024, 6, 1),
            Some(date(2024, 7, 1)),
        );

        let sweep_at = at_noon(date(2024, 7, 2));
        assert_eq!(
            run_sweep(&fx.registry, sweep_at).unwrap().relationships_expired,
            1
        );
        assert_eq!(
            run_sweep(&fx.registry, sweep_at).unwrap(),
            SweepOutcome::default()
        );
    }
}
