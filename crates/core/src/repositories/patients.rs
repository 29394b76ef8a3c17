//! Patient record management.
//!
//! Patients carry the demographic fields the relationship model depends on
//! (date of birth for age windows, date of death for new-relationship
//! refusal) plus their hospital identifiers and legacy correlation ids.

use crate::audit::{AuditMessage, CommitAction};
use crate::store::RecordKind;
use crate::validation::validate_ramq;
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::PatientInput;
use opal_types::{HospitalIdentifier, NonEmptyText, Patient, Site};
use uuid::Uuid;

/// Service for patient record operations.
#[derive(Clone)]
pub struct PatientService {
    registry: Registry,
}

impl PatientService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates a new patient record.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidInput` for shape violations (blank names,
    /// malformed RAMQ, death before birth), `NotFound` for unknown sites,
    /// and `Conflict` for RAMQ/legacy-id/MRN uniqueness violations.
    pub fn create(&self, author: &Author, input: PatientInput) -> AdminResult<Patient> {
        let _guard = self.registry.lock_for_write()?;

        let patient = self.build_patient(Uuid::new_v4(), input)?;
        self.ensure_unique(&patient, None)?;

        let message = AuditMessage::new(
            RecordKind::Patient.commit_domain(),
            CommitAction::Create,
            format!("patient {} created", patient.id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Patient, patient.id, &patient)?;

        Ok(patient)
    }

    pub fn get(&self, id: Uuid) -> AdminResult<Patient> {
        self.registry.require(RecordKind::Patient, id)
    }

    /// Lists patients ordered by last then first name.
    pub fn list(&self) -> AdminResult<Vec<Patient>> {
        let mut patients: Vec<Patient> = self.registry.list(RecordKind::Patient)?;
        patients.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(patients)
    }

    /// Updates an existing patient record.
    pub fn update(&self, author: &Author, id: Uuid, input: PatientInput) -> AdminResult<Patient> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: Patient = self.registry.require(RecordKind::Patient, id)?;
        let patient = self.build_patient(id, input)?;
        self.ensure_unique(&patient, Some(id))?;

        let message = AuditMessage::new(
            RecordKind::Patient.commit_domain(),
            CommitAction::Update,
            format!("patient {} updated", id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Patient, id, &patient)?;

        Ok(patient)
    }

    /// Finds a patient by site acronym and medical record number.
    ///
    /// Only active hospital identifiers participate in the lookup.
    pub fn find_by_site_mrn(&self, site_acronym: &str, mrn: &str) -> AdminResult<Patient> {
        let sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        let site = sites
            .iter()
            .find(|site| site.acronym.eq_ignore_ascii_case(site_acronym))
            .ok_or_else(|| AdminError::NotFound {
                kind: "site",
                id: site_acronym.to_string(),
            })?;

        let patients: Vec<Patient> = self.registry.list(RecordKind::Patient)?;
        patients
            .into_iter()
            .find(|patient| {
                patient
                    .hospital_identifiers
                    .iter()
                    .any(|hospital_id| {
                        hospital_id.site_id == site.id
                            && hospital_id.mrn == mrn
                            && hospital_id.is_active
                    })
            })
            .ok_or_else(|| AdminError::NotFound {
                kind: "patient",
                id: format!("{site_acronym}:{mrn}"),
            })
    }

    /// Finds a patient by RAMQ number.
    pub fn find_by_ramq(&self, ramq: &str) -> AdminResult<Patient> {
        let patients: Vec<Patient> = self.registry.list(RecordKind::Patient)?;
        patients
            .into_iter()
            .find(|patient| patient.ramq.as_deref() == Some(ramq))
            .ok_or_else(|| AdminError::NotFound {
                kind: "patient",
                id: ramq.to_string(),
            })
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    fn build_patient(&self, id: Uuid, input: PatientInput) -> AdminResult<Patient> {
        let first_name = required_text(&input.first_name, "first_name")?;
        let last_name = required_text(&input.last_name, "last_name")?;

        if let Some(date_of_death) = input.date_of_death {
            if date_of_death.date_naive() < input.date_of_birth {
                return Err(AdminError::InvalidInput(
                    "date of death cannot be earlier than date of birth".into(),
                ));
            }
        }

        let ramq = match input.ramq {
            Some(ramq) if !ramq.trim().is_empty() => {
                let ramq = ramq.trim().to_owned();
                validate_ramq(&ramq)?;
                Some(ramq)
            }
            _ => None,
        };

        if let Some(legacy_id) = input.legacy_id {
            if legacy_id < 1 {
                return Err(AdminError::InvalidInput(
                    "legacy_id must be at least 1".into(),
                ));
            }
        }

        let sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        let mut hospital_identifiers = Vec::with_capacity(input.hospital_identifiers.len());
        for identifier in input.hospital_identifiers {
            if identifier.mrn.trim().is_empty() {
                return Err(AdminError::InvalidInput("mrn cannot be empty".into()));
            }
            if !sites.iter().any(|site| site.id == identifier.site_id) {
                return Err(AdminError::NotFound {
                    kind: "site",
                    id: identifier.site_id.to_string(),
                });
            }
            let mrn = identifier.mrn.trim().to_owned();
            let duplicate_within = hospital_identifiers
                .iter()
                .any(|existing: &HospitalIdentifier| {
                    existing.site_id == identifier.site_id && existing.mrn == mrn
                });
            if duplicate_within {
                return Err(AdminError::Conflict(format!(
                    "duplicate hospital identifier for site {} and MRN {mrn}",
                    identifier.site_id
                )));
            }
            hospital_identifiers.push(HospitalIdentifier {
                site_id: identifier.site_id,
                mrn,
                is_active: identifier.is_active,
            });
        }

        Ok(Patient {
            id,
            first_name,
            last_name,
            date_of_birth: input.date_of_birth,
            date_of_death: input.date_of_death,
            sex: input.sex,
            ramq,
            legacy_id: input.legacy_id,
            hospital_identifiers,
        })
    }

    fn ensure_unique(&self, patient: &Patient, exclude: Option<Uuid>) -> AdminResult<()> {
        let others: Vec<Patient> = self.registry.list(RecordKind::Patient)?;
        for other in others.iter().filter(|other| Some(other.id) != exclude) {
            if patient.ramq.is_some() && other.ramq == patient.ramq {
                return Err(AdminError::Conflict(
                    "a patient with this RAMQ number already exists".into(),
                ));
            }
            if patient.legacy_id.is_some() && other.legacy_id == patient.legacy_id {
                return Err(AdminError::Conflict(
                    "a patient with this legacy id already exists".into(),
                ));
            }
            for identifier in &patient.hospital_identifiers {
                let taken = other.hospital_identifiers.iter().any(|existing| {
                    existing.site_id == identifier.site_id && existing.mrn == identifier.mrn
                });
                if taken {
                    return Err(AdminError::Conflict(format!(
                        "MRN {} is already registered at that site",
                        identifier.mrn
                    )));
                }
            }
        }
        Ok(())
    }
}

fn required_text(value: &str, field: &str) -> AdminResult<String> {
    NonEmptyText::new(value)
        .map(|text| text.as_str().to_owned())
        .map_err(|_| AdminError::InvalidInput(format!("{field} cannot be empty")))
}
