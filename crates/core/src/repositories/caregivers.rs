//! Caregiver profile management.
//!
//! Caregiver accounts are created by the external identity provider; this
//! service keeps the profile records the relationship model links against.
//! The `username` is the account identifier the companion applications send
//! in the `Appuserid` header.

use crate::audit::{AuditMessage, CommitAction};
use crate::store::RecordKind;
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::CaregiverInput;
use opal_types::{CaregiverProfile, EmailAddress, NonEmptyText};
use uuid::Uuid;

/// Service for caregiver profile operations.
#[derive(Clone)]
pub struct CaregiverService {
    registry: Registry,
}

impl CaregiverService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates a new caregiver profile.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidInput` for blank fields or a malformed
    /// email address and `Conflict` for a duplicate username or legacy id.
    pub fn create(&self, author: &Author, input: CaregiverInput) -> AdminResult<CaregiverProfile> {
        let _guard = self.registry.lock_for_write()?;

        let caregiver = build_caregiver(Uuid::new_v4(), input)?;
        self.ensure_unique(&caregiver, None)?;

        let message = AuditMessage::new(
            RecordKind::Caregiver.commit_domain(),
            CommitAction::Create,
            format!("caregiver {} created", caregiver.id.simple()),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::Caregiver,
            caregiver.id,
            &caregiver,
        )?;

        Ok(caregiver)
    }

    pub fn get(&self, id: Uuid) -> AdminResult<CaregiverProfile> {
        self.registry.require(RecordKind::Caregiver, id)
    }

    /// Finds a caregiver by username.
    pub fn get_by_username(&self, username: &str) -> AdminResult<CaregiverProfile> {
        let caregivers: Vec<CaregiverProfile> = self.registry.list(RecordKind::Caregiver)?;
        caregivers
            .into_iter()
            .find(|caregiver| caregiver.username == username)
            .ok_or_else(|| AdminError::NotFound {
                kind: "caregiver",
                id: username.to_string(),
            })
    }

    /// Lists caregivers ordered by last then first name.
    pub fn list(&self) -> AdminResult<Vec<CaregiverProfile>> {
        let mut caregivers: Vec<CaregiverProfile> = self.registry.list(RecordKind::Caregiver)?;
        caregivers.sort_by(|a, b| {
            (a.last_name.as_str(), a.first_name.as_str())
                .cmp(&(b.last_name.as_str(), b.first_name.as_str()))
        });
        Ok(caregivers)
    }

    /// Updates an existing caregiver profile.
    pub fn update(
        &self,
        author: &Author,
        id: Uuid,
        input: CaregiverInput,
    ) -> AdminResult<CaregiverProfile> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: CaregiverProfile = self.registry.require(RecordKind::Caregiver, id)?;
        let caregiver = build_caregiver(id, input)?;
        self.ensure_unique(&caregiver, Some(id))?;

        let message = AuditMessage::new(
            RecordKind::Caregiver.commit_domain(),
            CommitAction::Update,
            format!("caregiver {} updated", id.simple()),
        )?;
        self.registry
            .save_and_commit(author, &message, RecordKind::Caregiver, id, &caregiver)?;

        Ok(caregiver)
    }

    fn ensure_unique(&self, caregiver: &CaregiverProfile, exclude: Option<Uuid>) -> AdminResult<()> {
        let others: Vec<CaregiverProfile> = self.registry.list(RecordKind::Caregiver)?;
        for other in others.iter().filter(|other| Some(other.id) != exclude) {
            if other.username == caregiver.username {
                return Err(AdminError::Conflict(format!(
                    "a caregiver with username '{}' already exists",
                    caregiver.username
                )));
            }
            if caregiver.legacy_id.is_some() && other.legacy_id == caregiver.legacy_id {
                return Err(AdminError::Conflict(
                    "a caregiver with this legacy id already exists".into(),
                ));
            }
        }
        Ok(())
    }
}

fn build_caregiver(id: Uuid, input: CaregiverInput) -> AdminResult<CaregiverProfile> {
    let username = NonEmptyText::new(&input.username)
        .map_err(|_| AdminError::InvalidInput("username cannot be empty".into()))?;
    let first_name = NonEmptyText::new(&input.first_name)
        .map_err(|_| AdminError::InvalidInput("first_name cannot be empty".into()))?;
    let last_name = NonEmptyText::new(&input.last_name)
        .map_err(|_| AdminError::InvalidInput("last_name cannot be empty".into()))?;
    let email = EmailAddress::parse(&input.email)
        .map_err(|_| AdminError::InvalidInput("email is not a valid email address".into()))?;

    if let Some(legacy_id) = input.legacy_id {
        if legacy_id < 1 {
            return Err(AdminError::InvalidInput(
                "legacy_id must be at least 1".into(),
            ));
        }
    }

    Ok(CaregiverProfile {
        id,
        username: username.as_str().to_owned(),
        first_name: first_name.as_str().to_owned(),
        last_name: last_name.as_str().to_owned(),
        email: email.as_str().to_owned(),
        language: input.language,
        legacy_id: input.legacy_id,
    })
}
