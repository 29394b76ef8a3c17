//! Institution and site management.
//!
//! Institutions carry the settings that drive relationship behaviour (age of
//! majority, registration code validity); sites anchor patient hospital
//! identifiers. Both are plain CRUD with uniqueness and referential checks.

use crate::audit::{AuditMessage, CommitAction};
use crate::constants::DEFAULT_CODE_VALID_HOURS;
use crate::store::RecordKind;
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::{InstitutionInput, SiteInput};
use opal_types::{EmailAddress, HospitalIdentifier, Institution, NonEmptyText, Patient, Site};
use uuid::Uuid;

const DEFAULT_ADULTHOOD_AGE: u32 = 18;
const MAX_ADULTHOOD_AGE: u32 = 99;

/// Service for institution and site operations.
#[derive(Clone)]
pub struct HospitalService {
    registry: Registry,
}

impl HospitalService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    // ------------------------------------------------------------------
    // Institutions
    // ------------------------------------------------------------------

    /// Creates a new institution.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidInput` for blank fields or out-of-range
    /// settings and `AdminError::Conflict` for a duplicate acronym.
    pub fn create_institution(
        &self,
        author: &Author,
        input: InstitutionInput,
    ) -> AdminResult<Institution> {
        let _guard = self.registry.lock_for_write()?;

        let institution = Institution {
            id: Uuid::new_v4(),
            name: validated_name(&input.name, "name")?,
            acronym: validated_name(&input.acronym, "acronym")?,
            support_email: validated_email(&input.support_email)?,
            adulthood_age: validated_adulthood_age(input.adulthood_age)?,
            registration_code_valid_period_hours: input
                .registration_code_valid_period_hours
                .unwrap_or(DEFAULT_CODE_VALID_HOURS),
        };

        self.ensure_institution_acronym_unique(&institution.acronym, None)?;

        let message = AuditMessage::new(
            RecordKind::Institution.commit_domain(),
            CommitAction::Create,
            format!("institution {} created", institution.id.simple()),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::Institution,
            institution.id,
            &institution,
        )?;

        Ok(institution)
    }

    pub fn get_institution(&self, id: Uuid) -> AdminResult<Institution> {
        self.registry.require(RecordKind::Institution, id)
    }

    /// Lists institutions ordered by name.
    pub fn list_institutions(&self) -> AdminResult<Vec<Institution>> {
        let mut institutions: Vec<Institution> = self.registry.list(RecordKind::Institution)?;
        institutions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(institutions)
    }

    /// Updates an existing institution.
    pub fn update_institution(
        &self,
        author: &Author,
        id: Uuid,
        input: InstitutionInput,
    ) -> AdminResult<Institution> {
        let _guard = self.registry.lock_for_write()?;

        let existing: Institution = self.registry.require(RecordKind::Institution, id)?;
        let updated = Institution {
            id: existing.id,
            name: validated_name(&input.name, "name")?,
            acronym: validated_name(&input.acronym, "acronym")?,
            support_email: validated_email(&input.support_email)?,
            adulthood_age: validated_adulthood_age(input.adulthood_age)?,
            registration_code_valid_period_hours: input
                .registration_code_valid_period_hours
                .unwrap_or(existing.registration_code_valid_period_hours),
        };

        self.ensure_institution_acronym_unique(&updated.acronym, Some(id))?;

        let message = AuditMessage::new(
            RecordKind::Institution.commit_domain(),
            CommitAction::Update,
            format!("institution {} updated", id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Institution, id, &updated)?;

        Ok(updated)
    }

    /// Deletes an institution that has no sites.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InUse` when sites still reference it.
    pub fn delete_institution(&self, author: &Author, id: Uuid) -> AdminResult<()> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: Institution = self.registry.require(RecordKind::Institution, id)?;
        let sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        if sites.iter().any(|site| site.institution_id == id) {
            return Err(AdminError::InUse(
                "institution still has sites attached".into(),
            ));
        }

        let message = AuditMessage::new(
            RecordKind::Institution.commit_domain(),
            CommitAction::Remove,
            format!("institution {} removed", id.simple()),
        )?;
        self.registry
            .remove_and_commit(author, &message, RecordKind::Institution, id)
    }

    // ------------------------------------------------------------------
    // Sites
    // ------------------------------------------------------------------

    /// Creates a new site under an existing institution.
    pub fn create_site(&self, author: &Author, input: SiteInput) -> AdminResult<Site> {
        let _guard = self.registry.lock_for_write()?;

        let _institution: Institution = self
            .registry
            .require(RecordKind::Institution, input.institution_id)?;

        let site = Site {
            id: Uuid::new_v4(),
            institution_id: input.institution_id,
            name: validated_name(&input.name, "name")?,
            acronym: validated_name(&input.acronym, "acronym")?,
            parking_url: input.parking_url,
            direction_url: input.direction_url,
            longitude: input.longitude,
            latitude: input.latitude,
        };

        self.ensure_site_acronym_unique(&site.acronym, None)?;

        let message = AuditMessage::new(
            RecordKind::Site.commit_domain(),
            CommitAction::Create,
            format!("site {} created", site.id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Site, site.id, &site)?;

        Ok(site)
    }

    pub fn get_site(&self, id: Uuid) -> AdminResult<Site> {
        self.registry.require(RecordKind::Site, id)
    }

    /// Lists sites ordered by name.
    pub fn list_sites(&self) -> AdminResult<Vec<Site>> {
        let mut sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        sites.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sites)
    }

    /// Finds a site by its acronym (case-insensitive).
    pub fn find_site_by_acronym(&self, acronym: &str) -> AdminResult<Site> {
        let sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        sites
            .into_iter()
            .find(|site| site.acronym.eq_ignore_ascii_case(acronym))
            .ok_or_else(|| AdminError::NotFound {
                kind: "site",
                id: acronym.to_string(),
            })
    }

    /// Updates an existing site.
    pub fn update_site(&self, author: &Author, id: Uuid, input: SiteInput) -> AdminResult<Site> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: Site = self.registry.require(RecordKind::Site, id)?;
        let _institution: Institution = self
            .registry
            .require(RecordKind::Institution, input.institution_id)?;

        let updated = Site {
            id,
            institution_id: input.institution_id,
            name: validated_name(&input.name, "name")?,
            acronym: validated_name(&input.acronym, "acronym")?,
            parking_url: input.parking_url,
            direction_url: input.direction_url,
            longitude: input.longitude,
            latitude: input.latitude,
        };

        self.ensure_site_acronym_unique(&updated.acronym, Some(id))?;

        let message = AuditMessage::new(
            RecordKind::Site.commit_domain(),
            CommitAction::Update,
            format!("site {} updated", id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Site, id, &updated)?;

        Ok(updated)
    }

    /// Deletes a site not referenced by any patient hospital identifier.
    pub fn delete_site(&self, author: &Author, id: Uuid) -> AdminResult<()> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: Site = self.registry.require(RecordKind::Site, id)?;
        let patients: Vec<Patient> = self.registry.list(RecordKind::Patient)?;
        let referenced = patients.iter().any(|patient| {
            patient
                .hospital_identifiers
                .iter()
                .any(|hospital_id: &HospitalIdentifier| hospital_id.site_id == id)
        });
        if referenced {
            return Err(AdminError::InUse(
                "site is referenced by patient hospital identifiers".into(),
            ));
        }

        let message = AuditMessage::new(
            RecordKind::Site.commit_domain(),
            CommitAction::Remove,
            format!("site {} removed", id.simple()),
        )?;
        self.registry
            .remove_and_commit(author, &message, RecordKind::Site, id)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn ensure_institution_acronym_unique(
        &self,
        acronym: &str,
        exclude: Option<Uuid>,
    ) -> AdminResult<()> {
        let institutions: Vec<Institution> = self.registry.list(RecordKind::Institution)?;
        let duplicate = institutions.iter().any(|other| {
            Some(other.id) != exclude && other.acronym.eq_ignore_ascii_case(acronym)
        });
        if duplicate {
            return Err(AdminError::Conflict(format!(
                "an institution with acronym '{acronym}' already exists"
            )));
        }
        Ok(())
    }

    fn ensure_site_acronym_unique(&self, acronym: &str, exclude: Option<Uuid>) -> AdminResult<()> {
        let sites: Vec<Site> = self.registry.list(RecordKind::Site)?;
        let duplicate = sites
            .iter()
            .any(|other| Some(other.id) != exclude && other.acronym.eq_ignore_ascii_case(acronym));
        if duplicate {
            return Err(AdminError::Conflict(format!(
                "a site with acronym '{acronym}' already exists"
            )));
        }
        Ok(())
    }
}

fn validated_name(value: &str, field: &str) -> AdminResult<String> {
    NonEmptyText::new(value)
        .map(|text| text.as_str().to_owned())
        .map_err(|_| AdminError::InvalidInput(format!("{field} cannot be empty")))
}

fn validated_email(value: &str) -> AdminResult<String> {
    EmailAddress::parse(value)
        .map(|email| email.as_str().to_owned())
        .map_err(|_| AdminError::InvalidInput("support_email is not a valid email address".into()))
}

fn validated_adulthood_age(value: Option<u32>) -> AdminResult<u32> {
    let age = value.unwrap_or(DEFAULT_ADULTHOOD_AGE);
    if age > MAX_ADULTHOOD_AGE {
        return Err(AdminError::InvalidInput(format!(
            "adulthood_age must be at most {MAX_ADULTHOOD_AGE}"
        )));
    }
    Ok(age)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreConfig;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_service(temp: &TempDir) -> HospitalService {
        let cfg = Arc::new(CoreConfig::new(temp.path().to_path_buf()).unwrap());
        HospitalService::new(Registry::open(cfg).unwrap())
    }

    fn test_author() -> Author {
        Author::new("Test Admin", "admin@hospital.example").unwrap()
    }

    fn institution_input(acronym: &str) -> InstitutionInput {
        InstitutionInput {
            name: "General Hospital".into(),
            acronym: acronym.into(),
            support_email: "support@hospital.example".into(),
            adulthood_age: None,
            registration_code_valid_period_hours: None,
        }
    }

    fn site_input(institution_id: Uuid, acronym: &str) -> SiteInput {
        SiteInput {
            institution_id,
            name: "Main Site".into(),
            acronym: acronym.into(),
            parking_url: "https://hospital.example/parking".into(),
            direction_url: "https://hospital.example/directions".into(),
            longitude: -73.58,
            latitude: 45.47,
        }
    }

    #[test]
    fn create_institution_applies_defaults() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);

        let institution = service
            .create_institution(&test_author(), institution_input("GH"))
            .unwrap();

        assert_eq!(institution.adulthood_age, 18);
        assert_eq!(institution.registration_code_valid_period_hours, 72);
    }

    #[test]
    fn duplicate_institution_acronym_is_rejected() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);
        let author = test_author();

        service
            .create_institution(&author, institution_input("GH"))
            .unwrap();
        let err = service
            .create_institution(&author, institution_input("gh"))
            .expect_err("case-insensitive duplicate should be rejected");
        assert!(matches!(err, AdminError::Conflict(_)));
    }

    #[test]
    fn create_site_requires_existing_institution() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);

        let err = service
            .create_site(&test_author(), site_input(Uuid::new_v4(), "MGH"))
            .expect_err("unknown institution should be rejected");
        assert!(matches!(err, AdminError::NotFound { .. }));
    }

    #[test]
    fn delete_institution_with_sites_is_rejected() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);
        let author = test_author();

        let institution = service
            .create_institution(&author, institution_input("GH"))
            .unwrap();
        service
            .create_site(&author, site_input(institution.id, "MGH"))
            .unwrap();

        let err = service
            .delete_institution(&author, institution.id)
            .expect_err("institution with sites should not be deletable");
        assert!(matches!(err, AdminError::InUse(_)));
    }

    #[test]
    fn delete_institution_without_sites_succeeds() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);
        let author = test_author();

        let institution = service
            .create_institution(&author, institution_input("GH"))
            .unwrap();
        service.delete_institution(&author, institution.id).unwrap();

        let err = service
            .get_institution(institution.id)
            .expect_err("deleted institution should be gone");
        assert!(matches!(err, AdminError::NotFound { .. }));
    }

    #[test]
    fn find_site_by_acronym_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);
        let author = test_author();

        let institution = service
            .create_institution(&author, institution_input("GH"))
            .unwrap();
        let site = service
            .create_site(&author, site_input(institution.id, "MGH"))
            .unwrap();

        let found = service.find_site_by_acronym("mgh").unwrap();
        assert_eq!(found.id, site.id);
    }

    #[test]
    fn list_institutions_is_ordered_by_name() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);
        let author = test_author();

        let mut input_b = institution_input("BH");
        input_b.name = "B Hospital".into();
        let mut input_a = institution_input("AH");
        input_a.name = "A Hospital".into();

        service.create_institution(&author, input_b).unwrap();
        service.create_institution(&author, input_a).unwrap();

        let names: Vec<String> = service
            .list_institutions()
            .unwrap()
            .into_iter()
            .map(|institution| institution.name)
            .collect();
        assert_eq!(names, vec!["A Hospital", "B Hospital"]);
    }

    #[test]
    fn invalid_support_email_is_rejected() {
        let temp = TempDir::new().unwrap();
        let service = test_service(&temp);

        let mut input = institution_input("GH");
        input.support_email = "not-an-email".into();
        let err = service
            .create_institution(&test_author(), input)
            .expect_err("invalid email should be rejected");
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }
}
