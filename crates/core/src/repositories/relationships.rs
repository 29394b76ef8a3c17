//! Caregiver-patient relationship management.
//!
//! Relationships are the central association of the platform: every access
//! decision traces back to one. They move through a small state machine
//! (`RelationshipStatus`) and are never deleted; terminal records stay in the
//! registry for audit.

use crate::access::relationship_grants_access;
use crate::audit::{AuditMessage, CommitAction};
use crate::store::RecordKind;
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::RelationshipRequest;
use chrono::{Months, NaiveDate};
use opal_types::{Patient, Relationship, RelationshipStatus, RelationshipType, RoleType};
use std::collections::HashMap;
use uuid::Uuid;

/// Criteria for listing relationships. Empty filters match everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct RelationshipFilter {
    pub patient_id: Option<Uuid>,
    pub caregiver_id: Option<Uuid>,
    pub status: Option<RelationshipStatus>,
}

impl RelationshipFilter {
    fn matches(&self, relationship: &Relationship) -> bool {
        self.patient_id
            .map_or(true, |id| relationship.patient_id == id)
            && self
                .caregiver_id
                .map_or(true, |id| relationship.caregiver_id == id)
            && self.status.map_or(true, |s| relationship.status == s)
    }
}

/// Service for relationship operations.
#[derive(Clone)]
pub struct RelationshipService {
    registry: Registry,
}

impl RelationshipService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Records a new relationship request.
    ///
    /// The patient must be alive and their age on the request date must fall
    /// inside the type's authorised window. An administrator may pass
    /// `confirm` to approve the relationship in the same step.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown patient, caregiver or type,
    /// `DeceasedPatient`, `AgeOutsideTypeWindow`, `Conflict` for duplicate
    /// active relationships or a second self relationship, and
    /// `InvalidInput` for an inverted date range.
    pub fn request(
        &self,
        author: &Author,
        req: RelationshipRequest,
        today: NaiveDate,
    ) -> AdminResult<Relationship> {
        let _guard = self.registry.lock_for_write()?;

        let patient: Patient = self.registry.require(RecordKind::Patient, req.patient_id)?;
        let _caregiver: opal_types::CaregiverProfile =
            self.registry.require(RecordKind::Caregiver, req.caregiver_id)?;
        let relationship_type: RelationshipType =
            self.registry.require(RecordKind::RelationshipType, req.type_id)?;

        if patient.is_deceased() {
            return Err(AdminError::DeceasedPatient);
        }

        let request_date = req.request_date.unwrap_or(today);
        let age = patient.age_on(request_date);
        if !relationship_type.covers_age(age) {
            return Err(AdminError::AgeOutsideTypeWindow {
                age,
                type_name: relationship_type.name.clone(),
            });
        }

        self.ensure_no_conflicting_relationship(&req, &relationship_type)?;

        let start_date = req.start_date.unwrap_or(request_date);
        let end_date = match req.end_date {
            Some(date) => Some(date),
            None => default_end_date(&patient, &relationship_type),
        };
        if let Some(end) = end_date {
            if start_date >= end {
                return Err(AdminError::InvalidInput(
                    "start_date must precede end_date".into(),
                ));
            }
        }

        let relationship = Relationship {
            id: Uuid::new_v4(),
            patient_id: req.patient_id,
            caregiver_id: req.caregiver_id,
            type_id: req.type_id,
            status: if req.confirm {
                RelationshipStatus::Confirmed
            } else {
                RelationshipStatus::Pending
            },
            reason: String::new(),
            request_date,
            start_date,
            end_date,
        };

        let message = AuditMessage::new(
            RecordKind::Relationship.commit_domain(),
            CommitAction::Create,
            format!(
                "relationship {} requested ({})",
                relationship.id.simple(),
                relationship.status
            ),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::Relationship,
            relationship.id,
            &relationship,
        )?;

        Ok(relationship)
    }

    pub fn get(&self, id: Uuid) -> AdminResult<Relationship> {
        self.registry.require(RecordKind::Relationship, id)
    }

    /// Lists relationships matching the filter, ordered by request date then
    /// id for a stable listing.
    pub fn list(&self, filter: RelationshipFilter) -> AdminResult<Vec<Relationship>> {
        let mut relationships: Vec<Relationship> = self
            .registry
            .list(RecordKind::Relationship)?
            .into_iter()
            .filter(|relationship| filter.matches(relationship))
            .collect();
        relationships.sort_by(|a, b| (a.request_date, a.id).cmp(&(b.request_date, b.id)));
        Ok(relationships)
    }

    /// Approves a pending relationship.
    pub fn confirm(&self, author: &Author, id: Uuid) -> AdminResult<Relationship> {
        self.set_status(
            author,
            id,
            RelationshipStatus::Confirmed,
            None,
            CommitAction::Confirm,
        )
    }

    /// Rejects a pending relationship. The reason is mandatory.
    pub fn deny(&self, author: &Author, id: Uuid, reason: &str) -> AdminResult<Relationship> {
        self.set_status(
            author,
            id,
            RelationshipStatus::Denied,
            Some(reason),
            CommitAction::Deny,
        )
    }

    /// Withdraws a confirmed relationship. The reason is mandatory.
    pub fn revoke(&self, author: &Author, id: Uuid, reason: &str) -> AdminResult<Relationship> {
        self.set_status(
            author,
            id,
            RelationshipStatus::Revoked,
            Some(reason),
            CommitAction::Revoke,
        )
    }

    /// Ends a confirmed relationship, recording the given reason.
    ///
    /// Used by the expiry sweep; the reason describes which bound lapsed.
    pub fn expire(&self, author: &Author, id: Uuid, reason: &str) -> AdminResult<Relationship> {
        self.set_status(
            author,
            id,
            RelationshipStatus::Expired,
            Some(reason),
            CommitAction::Expire,
        )
    }

    /// Patients the given caregiver account currently has access to,
    /// ordered by last then first name.
    pub fn patients_for_caregiver(
        &self,
        username: &str,
        today: NaiveDate,
    ) -> AdminResult<Vec<Patient>> {
        let caregivers: Vec<opal_types::CaregiverProfile> =
            self.registry.list(RecordKind::Caregiver)?;
        let caregiver = caregivers
            .into_iter()
            .find(|caregiver| caregiver.username == username)
            .ok_or_else(|| AdminError::NotFound {
                kind: "caregiver",
                id: username.to_string(),
            })?;

        let relationships = self.list(RelationshipFilter {
            caregiver_id: Some(caregiver.id),
            ..RelationshipFilter::default()
        })?;

        let mut patients: HashMap<Uuid, Patient> = HashMap::new();
        for relationship in &relationships {
            if patients.contains_key(&relationship.patient_id) {
                continue;
            }
            let Some(patient) = self
                .registry
                .load::<Patient>(RecordKind::Patient, relationship.patient_id)?
            else {
                continue;
            };
            let Some(relationship_type) = self
                .registry
                .load::<RelationshipType>(RecordKind::RelationshipType, relationship.type_id)?
            else {
                continue;
            };
            if relationship_grants_access(relationship, &relationship_type, &patient, today) {
                patients.insert(patient.id, patient);
            }
        }

        let mut patients: Vec<Patient> = patients.into_values().collect();
        patients.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(patients)
    }

    fn set_status(
        &self,
        author: &Author,
        id: Uuid,
        target: RelationshipStatus,
        reason: Option<&str>,
        action: CommitAction,
    ) -> AdminResult<Relationship> {
        let _guard = self.registry.lock_for_write()?;

        let mut relationship: Relationship = self.registry.require(RecordKind::Relationship, id)?;
        if !relationship.status.can_transition_to(target) {
            return Err(AdminError::InvalidTransition {
                from: relationship.status,
                to: target,
            });
        }

        let reason = reason.map(str::trim).unwrap_or_default();
        if RelationshipStatus::requires_reason(target) && reason.is_empty() {
            return Err(AdminError::ReasonRequired(target));
        }

        relationship.status = target;
        relationship.reason = reason.to_owned();

        let message = AuditMessage::new(
            RecordKind::Relationship.commit_domain(),
            action,
            format!("relationship {} set to {target}", id.simple()),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::Relationship,
            id,
            &relationship,
        )?;

        Ok(relationship)
    }

    /// Enforces the duplicate and self-relationship constraints.
    ///
    /// At most one active relationship may exist per (patient, caregiver,
    /// type) triple. For the `Self_` role the rules are stricter: a
    /// caregiver-patient pair gets at most one self relationship ever
    /// (terminal ones included), and a patient at most one active self
    /// relationship overall.
    fn ensure_no_conflicting_relationship(
        &self,
        req: &RelationshipRequest,
        relationship_type: &RelationshipType,
    ) -> AdminResult<()> {
        let existing: Vec<Relationship> = self.registry.list(RecordKind::Relationship)?;

        for other in &existing {
            if other.patient_id == req.patient_id
                && other.caregiver_id == req.caregiver_id
                && other.type_id == req.type_id
                && other.status.is_active()
            {
                return Err(AdminError::Conflict(
                    "an active relationship of this type already exists for this \
                     caregiver and patient"
                        .into(),
                ));
            }
        }

        if relationship_type.role != RoleType::Self_ {
            return Ok(());
        }

        let types: Vec<RelationshipType> = self.registry.list(RecordKind::RelationshipType)?;
        let self_type_ids: Vec<Uuid> = types
            .iter()
            .filter(|other_type| other_type.role == RoleType::Self_)
            .map(|other_type| other_type.id)
            .collect();

        for other in &existing {
            if !self_type_ids.contains(&other.type_id) {
                continue;
            }
            if other.patient_id == req.patient_id && other.caregiver_id == req.caregiver_id {
                return Err(AdminError::Conflict(
                    "a self relationship already exists for this caregiver and patient".into(),
                ));
            }
            if other.patient_id == req.patient_id && other.status.is_active() {
                return Err(AdminError::Conflict(
                    "the patient already has an active self relationship".into(),
                ));
            }
        }

        Ok(())
    }
}

/// The date the patient reaches the type's end age, when the type has one.
fn default_end_date(patient: &Patient, relationship_type: &RelationshipType) -> Option<NaiveDate> {
    let end_age = relationship_type.end_age?;
    patient
        .date_of_birth
        .checked_add_months(Months::new(end_age * 12))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{CaregiverService, PatientService, RelationshipTypeService};
    use crate::CoreConfig;
    use api_shared::{CaregiverInput, PatientInput};
    use opal_types::{Language, SexType};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        service: RelationshipService,
        author: Author,
        patient: Patient,
        caregiver: opal_types::CaregiverProfile,
        guardian_type: RelationshipType,
        self_type: RelationshipType,
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

        let types = RelationshipTypeService::new(registry.clone());
        let seeded = types.seed_defaults(&author).unwrap();
        let guardian_type = seeded
            .iter()
            .find(|relationship_type| relationship_type.name == "Parent/Guardian")
            .unwrap()
            .clone();
        let self_type = seeded
            .iter()
            .find(|relationship_type| relationship_type.name == "Self")
            .unwrap()
            .clone();

        Fixture {
            service: RelationshipService::new(registry),
            author,
            patient,
            caregiver,
            guardian_type,
            self_type,
        }
    }

    fn guardian_request(fx: &Fixture) -> RelationshipRequest {
        RelationshipRequest {
            patient_id: fx.patient.id,
            caregiver_id: fx.caregiver.id,
            type_id: fx.guardian_type.id,
            request_date: None,
            start_date: None,
            end_date: None,
            confirm: false,
        }
    }

    #[test]
    fn request_defaults_dates_and_starts_pending() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        let relationship = fx
            .service
            .request(&fx.author, guardian_request(&fx), today)
            .unwrap();

        assert_eq!(relationship.status, RelationshipStatus::Pending);
        assert_eq!(relationship.request_date, today);
        assert_eq!(relationship.start_date, today);
        // End date defaults to the patient's fourteenth birthday.
        assert_eq!(relationship.end_date, Some(date(2028, 2, 23)));
    }

    #[test]
    fn confirmed_on_request_when_admin_confirms() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let mut req = guardian_request(&fx);
        req.confirm = true;
        let relationship = fx.service.request(&fx.author, req, date(2024, 6, 1)).unwrap();
        assert_eq!(relationship.status, RelationshipStatus::Confirmed);
    }

    #[test]
    fn equal_start_and_end_dates_are_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let mut req = guardian_request(&fx);
        req.start_date = Some(date(2024, 9, 1));
        req.end_date = Some(date(2024, 9, 1));
        let err = fx
            .service
            .request(&fx.author, req, date(2024, 6, 1))
            .expect_err("start date must precede end date");
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }

    #[test]
    fn deceased_patient_is_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let mut deceased = fx.patient.clone();
        deceased.date_of_death = Some(chrono::Utc::now());
        crate::store::save(
            &fx.service.registry.registry_dir(),
            RecordKind::Patient,
            deceased.id,
            &deceased,
        )
        .unwrap();

        let err = fx
            .service
            .request(&fx.author, guardian_request(&fx), date(2024, 6, 1))
            .expect_err("deceased patient should be rejected");
        assert!(matches!(err, AdminError::DeceasedPatient));
    }

    #[test]
    fn age_outside_type_window_is_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        // Bart turns 14 on 2028-02-23; Parent/Guardian covers [0, 14).
        let err = fx
            .service
            .request(&fx.author, guardian_request(&fx), date(2028, 2, 23))
            .expect_err("patient past the type end age should be rejected");
        assert!(matches!(
            err,
            AdminError::AgeOutsideTypeWindow { age: 14, .. }
        ));
    }

    #[test]
    fn duplicate_active_relationship_is_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        fx.service
            .request(&fx.author, guardian_request(&fx), today)
            .unwrap();
        let err = fx
            .service
            .request(&fx.author, guardian_request(&fx), today)
            .expect_err("duplicate active relationship should be rejected");
        assert!(matches!(err, AdminError::Conflict(_)));
    }

    #[test]
    fn denied_relationship_can_be_requested_again() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        let first = fx
            .service
            .request(&fx.author, guardian_request(&fx), today)
            .unwrap();
        fx.service
            .deny(&fx.author, first.id, "incomplete documentation")
            .unwrap();

        fx.service
            .request(&fx.author, guardian_request(&fx), today)
            .expect("terminal relationship should not block a new request");
    }

    #[test]
    fn deny_without_reason_is_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let relationship = fx
            .service
            .request(&fx.author, guardian_request(&fx), date(2024, 6, 1))
            .unwrap();
        let err = fx
            .service
            .deny(&fx.author, relationship.id, "  ")
            .expect_err("blank reason should be rejected");
        assert!(matches!(
            err,
            AdminError::ReasonRequired(RelationshipStatus::Denied)
        ));
    }

    #[test]
    fn revoking_a_pending_relationship_is_an_invalid_transition() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);

        let relationship = fx
            .service
            .request(&fx.author, guardian_request(&fx), date(2024, 6, 1))
            .unwrap();
        let err = fx
            .service
            .revoke(&fx.author, relationship.id, "no longer needed")
            .expect_err("pending cannot be revoked");
        assert!(matches!(
            err,
            AdminError::InvalidTransition {
                from: RelationshipStatus::Pending,
                to: RelationshipStatus::Revoked,
            }
        ));
    }

    #[test]
    fn second_self_relationship_for_patient_is_rejected() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        // Bart is 14 or older from 2028-02-23, inside the Self window.
        let today = date(2028, 6, 1);

        let mut req = guardian_request(&fx);
        req.type_id = fx.self_type.id;
        fx.service.request(&fx.author, req.clone(), today).unwrap();

        let err = fx
            .service
            .request(&fx.author, req, today)
            .expect_err("second self relationship should be rejected");
        assert!(matches!(err, AdminError::Conflict(_)));
    }

    #[test]
    fn active_self_relationship_blocks_other_caregivers() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        // Bart is 14 or older from 2028-02-23, inside the Self window.
        let today = date(2028, 6, 1);

        let mut req = guardian_request(&fx);
        req.type_id = fx.self_type.id;
        fx.service.request(&fx.author, req.clone(), today).unwrap();

        let other_caregiver = CaregiverService::new(fx.service.registry.clone())
            .create(
                &fx.author,
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

        req.caregiver_id = other_caregiver.id;
        let err = fx
            .service
            .request(&fx.author, req, today)
            .expect_err("a patient gets one active self relationship");
        assert!(matches!(err, AdminError::Conflict(_)));
    }

    #[test]
    fn patients_for_caregiver_requires_confirmed_status() {
        let temp = TempDir::new().unwrap();
        let fx = fixture(&temp);
        let today = date(2024, 6, 1);

        let relationship = fx
            .service
            .request(&fx.author, guardian_request(&fx), today)
            .unwrap();
        assert!(fx
            .service
            .patients_for_caregiver("marge", today)
            .unwrap()
            .is_empty());

        fx.service.confirm(&fx.author, relationship.id).unwrap();
        let patients = fx.service.patients_for_caregiver("marge", today).unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].id, fx.patient.id);
    }
}
