//! Registration code workflow.
//!
//! A pending relationship can be completed by the caregiver themselves: an
//! administrator issues a one-time registration code, the caregiver retrieves
//! it in the companion app, proves control of their email address with a
//! verification code, and completes the registration. Codes expire after the
//! issuing institution's validity window and are blocked after repeated
//! failed verification attempts.

use crate::audit::{AuditMessage, CommitAction};
use crate::constants::{DEFAULT_CODE_VALID_HOURS, REGISTRATION_CODE_ALPHABET,
    REGISTRATION_CODE_LENGTH};
use crate::store::RecordKind;
use crate::validation::{validate_registration_code, validate_verification_code};
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::RegistrationDetailsRes;
use chrono::{DateTime, Duration, Utc};
use opal_types::{
    Institution, Patient, RegistrationCode, RegistrationCodeStatus, Relationship,
    RelationshipStatus, RelationshipType, RoleType, Site,
};
use rand::Rng;
use uuid::Uuid;

/// Service for registration code operations.
#[derive(Clone)]
pub struct RegistrationService {
    registry: Registry,
}

impl RegistrationService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Issues a registration code for a pending relationship.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown relationship and `Conflict` when the
    /// relationship is not pending or already has a usable code.
    pub fn issue(
        &self,
        author: &Author,
        relationship_id: Uuid,
        now: DateTime<Utc>,
    ) -> AdminResult<RegistrationCode> {
        let _guard = self.registry.lock_for_write()?;

        let relationship: Relationship =
            self.registry.require(RecordKind::Relationship, relationship_id)?;
        if relationship.status != RelationshipStatus::Pending {
            return Err(AdminError::Conflict(
                "registration codes can only be issued for pending relationships".into(),
            ));
        }

        let existing: Vec<RegistrationCode> = self.registry.list(RecordKind::RegistrationCode)?;
        if existing.iter().any(|code| {
            code.relationship_id == relationship_id && code.status == RegistrationCodeStatus::New
        }) {
            return Err(AdminError::Conflict(
                "a usable registration code already exists for this relationship".into(),
            ));
        }

        let mut rng = rand::thread_rng();
        let code_value = loop {
            let candidate = generate_code(&mut rng);
            if !existing.iter().any(|code| code.code == candidate) {
                break candidate;
            }
        };

        let registration_code = RegistrationCode {
            id: Uuid::new_v4(),
            relationship_id,
            code: code_value,
            status: RegistrationCodeStatus::New,
            created_at: now,
            attempts: 0,
            email_verification_code: format!("{:06}", rng.gen_range(0..1_000_000)),
        };

        let message = AuditMessage::new(
            RecordKind::RegistrationCode.commit_domain(),
            CommitAction::Create,
            format!(
                "registration code issued for relationship {}",
                relationship_id.simple()
            ),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::RegistrationCode,
            registration_code.id,
            &registration_code,
        )?;

        Ok(registration_code)
    }

    /// Details of a usable registration code, as shown to the caregiver
    /// before they verify their email address.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a malformed code value, `NotFound` for an
    /// unknown one and `CodeNotUsable` for expired, blocked or consumed
    /// codes. A code past its validity window is expired (and committed as
    /// such) on the way.
    pub fn retrieve(&self, code: &str, now: DateTime<Utc>) -> AdminResult<RegistrationDetailsRes> {
        let _guard = self.registry.lock_for_write()?;

        let registration_code = self.usable_code(code, now)?;
        let relationship: Relationship = self
            .registry
            .require(RecordKind::Relationship, registration_code.relationship_id)?;
        let patient: Patient = self.registry.require(RecordKind::Patient, relationship.patient_id)?;
        let relationship_type: RelationshipType = self
            .registry
            .require(RecordKind::RelationshipType, relationship.type_id)?;
        let institution = self.issuing_institution(&patient)?;

        Ok(RegistrationDetailsRes {
            code: registration_code.code,
            status: registration_code.status,
            patient_first_name: patient.first_name,
            patient_last_name: patient.last_name,
            relationship_type: relationship_type.name,
            institution_name: institution.map(|institution| institution.name),
        })
    }

    /// Checks a submitted email verification code.
    ///
    /// # Errors
    ///
    /// Returns `VerificationMismatch` with the remaining attempt count on a
    /// wrong code; once the attempt limit is reached the code is blocked and
    /// `CodeNotUsable` is returned instead.
    pub fn verify(
        &self,
        code: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> AdminResult<RegistrationCode> {
        let _guard = self.registry.lock_for_write()?;

        validate_verification_code(submitted)?;
        let registration_code = self.usable_code(code, now)?;
        self.check_verification(registration_code, submitted)
    }

    /// Completes a registration: the code is consumed and, for self-granted
    /// relationship types, the pending relationship is confirmed in the same
    /// audit commit.
    ///
    /// # Errors
    ///
    /// As for [`RegistrationService::verify`].
    pub fn register(
        &self,
        code: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> AdminResult<(RegistrationCode, Relationship)> {
        let _guard = self.registry.lock_for_write()?;

        validate_verification_code(submitted)?;
        let registration_code = self.usable_code(code, now)?;
        let mut registration_code = self.check_verification(registration_code, submitted)?;

        let mut relationship: Relationship = self
            .registry
            .require(RecordKind::Relationship, registration_code.relationship_id)?;
        let relationship_type: RelationshipType = self
            .registry
            .require(RecordKind::RelationshipType, relationship.type_id)?;

        registration_code.status = RegistrationCodeStatus::Registered;
        let code_path = self.registry.save(
            RecordKind::RegistrationCode,
            registration_code.id,
            &registration_code,
        )?;
        let mut paths = vec![code_path];

        if relationship_type.role == RoleType::Self_
            && relationship_type.can_be_self_granted
            && relationship.status == RelationshipStatus::Pending
        {
            relationship.status = RelationshipStatus::Confirmed;
            paths.push(self.registry.save(
                RecordKind::Relationship,
                relationship.id,
                &relationship,
            )?);
        }

        let message = AuditMessage::new(
            RecordKind::RegistrationCode.commit_domain(),
            CommitAction::Register,
            format!(
                "registration completed for relationship {}",
                relationship.id.simple()
            ),
        )?;
        let path_refs: Vec<&std::path::Path> =
            paths.iter().map(|path| path.as_path()).collect();
        self.registry
            .commit(&self.author_for_registration(), &message, &path_refs, &[])?;

        Ok((registration_code, relationship))
    }

    /// Expires every usable code whose validity window has elapsed.
    ///
    /// Called from the daily sweep; returns the number of codes expired.
    pub(crate) fn expire_stale_codes(&self, now: DateTime<Utc>) -> AdminResult<u32> {
        let _guard = self.registry.lock_for_write()?;

        let codes: Vec<RegistrationCode> = self.registry.list(RecordKind::RegistrationCode)?;
        let mut expired = 0;
        for mut registration_code in codes {
            if registration_code.status != RegistrationCodeStatus::New {
                continue;
            }
            let window = Duration::hours(self.validity_window_hours(&registration_code)? as i64);
            if now <= registration_code.created_at + window {
                continue;
            }

            registration_code.status = RegistrationCodeStatus::Expired;
            let message = AuditMessage::new(
                RecordKind::RegistrationCode.commit_domain(),
                CommitAction::Expire,
                format!("registration code {} expired", registration_code.id.simple()),
            )?;
            self.registry.save_and_commit(
                self.registry.cfg().system_author(),
                &message,
                RecordKind::RegistrationCode,
                registration_code.id,
                &registration_code,
            )?;
            expired += 1;
        }
        Ok(expired)
    }

    // Registrations are performed by the caregiver, not an administrator.
    fn author_for_registration(&self) -> Author {
        self.registry.cfg().system_author().clone()
    }

    /// Looks a code up and lazily expires it when its validity window has
    /// elapsed. Only `New` codes come back.
    fn usable_code(&self, code: &str, now: DateTime<Utc>) -> AdminResult<RegistrationCode> {
        validate_registration_code(code)?;

        let codes: Vec<RegistrationCode> = self.registry.list(RecordKind::RegistrationCode)?;
        let mut registration_code = codes
            .into_iter()
            .find(|candidate| candidate.code == code)
            .ok_or_else(|| AdminError::NotFound {
                kind: "registration code",
                id: code.to_string(),
            })?;

        if registration_code.status == RegistrationCodeStatus::New {
            let window = Duration::hours(self.validity_window_hours(&registration_code)? as i64);
            if now > registration_code.created_at + window {
                registration_code.status = RegistrationCodeStatus::Expired;
                let message = AuditMessage::new(
                    RecordKind::RegistrationCode.commit_domain(),
                    CommitAction::Expire,
                    format!("registration code {} expired", registration_code.id.simple()),
                )?;
                self.registry.save_and_commit(
                    self.registry.cfg().system_author(),
                    &message,
                    RecordKind::RegistrationCode,
                    registration_code.id,
                    &registration_code,
                )?;
            }
        }

        if registration_code.status != RegistrationCodeStatus::New {
            return Err(AdminError::CodeNotUsable {
                status: registration_code.status,
            });
        }
        Ok(registration_code)
    }

    fn check_verification(
        &self,
        mut registration_code: RegistrationCode,
        submitted: &str,
    ) -> AdminResult<RegistrationCode> {
        if submitted == registration_code.email_verification_code {
            return Ok(registration_code);
        }

        let limit = self.registry.cfg().registration_attempt_limit();
        registration_code.attempts += 1;

        if registration_code.attempts >= limit {
            registration_code.status = RegistrationCodeStatus::Blocked;
            let message = AuditMessage::new(
                RecordKind::RegistrationCode.commit_domain(),
                CommitAction::Block,
                format!(
                    "registration code {} blocked after {} failed attempts",
                    registration_code.id.simple(),
                    registration_code.attempts
                ),
            )?;
            self.registry.save_and_commit(
                self.registry.cfg().system_author(),
                &message,
                RecordKind::RegistrationCode,
                registration_code.id,
                &registration_code,
            )?;
            return Err(AdminError::CodeNotUsable {
                status: RegistrationCodeStatus::Blocked,
            });
        }

        let message = AuditMessage::new(
            RecordKind::RegistrationCode.commit_domain(),
            CommitAction::Update,
            format!(
                "registration code {} verification attempt failed",
                registration_code.id.simple()
            ),
        )?;
        self.registry.save_and_commit(
            self.registry.cfg().system_author(),
            &message,
            RecordKind::RegistrationCode,
            registration_code.id,
            &registration_code,
        )?;

        Err(AdminError::VerificationMismatch {
            attempts_remaining: limit - registration_code.attempts,
        })
    }

    /// Validity window for a code, taken from the institution of the
    /// patient's first hospital identifier; patients without one fall back
    /// to the platform default.
    fn validity_window_hours(&self, registration_code: &RegistrationCode) -> AdminResult<u32> {
        let Some(relationship) = self
            .registry
            .load::<Relationship>(RecordKind::Relationship, registration_code.relationship_id)?
        else {
            return Ok(DEFAULT_CODE_VALID_HOURS);
        };
        let Some(patient) = self
            .registry
            .load::<Patient>(RecordKind::Patient, relationship.patient_id)?
        else {
            return Ok(DEFAULT_CODE_VALID_HOURS);
        };
        Ok(self
            .issuing_institution(&patient)?
            .map_or(DEFAULT_CODE_VALID_HOURS, |institution| {
                institution.registration_code_valid_period_hours
            }))
    }

    /// Institution of the patient's first hospital identifier, if any.
    fn issuing_institution(&self, patient: &Patient) -> AdminResult<Option<Institution>> {
        let Some(identifier) = patient.hospital_identifiers.first() else {
            return Ok(None);
        };
        let Some(site) = self
            .registry
            .load::<Site>(RecordKind::Site, identifier.site_id)?
        else {
            return Ok(None);
        };
        self.registry
            .load(RecordKind::Institution, site.institution_id)
    }
}

fn generate_code(rng: &mut impl Rng) -> String {
    (0..REGISTRATION_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..REGISTRATION_CODE_ALPHABET.len());
            REGISTRATION_CODE_ALPHABET[idx] as char
        })
        .collect()
}
