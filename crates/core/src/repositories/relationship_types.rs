//! Relationship type management.
//!
//! Relationship types carry the constraints the state machine evaluates:
//! the authorised patient age window, questionnaire delegation, and whether
//! the type may be requested through the registration workflow.

use crate::audit::{AuditMessage, CommitAction};
use crate::constants::RELATIONSHIP_MAX_AGE;
use crate::store::RecordKind;
use crate::{AdminError, AdminResult, Author, Registry};
use api_shared::RelationshipTypeInput;
use opal_types::{NonEmptyText, Relationship, RelationshipType, RoleType};
use uuid::Uuid;

/// Service for relationship type operations.
#[derive(Clone)]
pub struct RelationshipTypeService {
    registry: Registry,
}

impl RelationshipTypeService {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Creates a new relationship type.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidInput` for blank names or an invalid age
    /// window and `Conflict` for duplicate names or a second type with the
    /// `Self_` role.
    pub fn create(
        &self,
        author: &Author,
        input: RelationshipTypeInput,
    ) -> AdminResult<RelationshipType> {
        let _guard = self.registry.lock_for_write()?;

        let relationship_type = build_type(Uuid::new_v4(), input)?;
        self.ensure_unique(&relationship_type, None)?;

        let message = AuditMessage::new(
            RecordKind::RelationshipType.commit_domain(),
            CommitAction::Create,
            format!(
                "relationship type {} created",
                relationship_type.id.simple()
            ),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::RelationshipType,
            relationship_type.id,
            &relationship_type,
        )?;

        Ok(relationship_type)
    }

    pub fn get(&self, id: Uuid) -> AdminResult<RelationshipType> {
        self.registry.require(RecordKind::RelationshipType, id)
    }

    /// Lists relationship types ordered by name.
    pub fn list(&self) -> AdminResult<Vec<RelationshipType>> {
        let mut types: Vec<RelationshipType> = self.registry.list(RecordKind::RelationshipType)?;
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    /// Updates an existing relationship type.
    pub fn update(
        &self,
        author: &Author,
        id: Uuid,
        input: RelationshipTypeInput,
    ) -> AdminResult<RelationshipType> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: RelationshipType = self.registry.require(RecordKind::RelationshipType, id)?;
        let relationship_type = build_type(id, input)?;
        self.ensure_unique(&relationship_type, Some(id))?;

        let message = AuditMessage::new(
            RecordKind::RelationshipType.commit_domain(),
            CommitAction::Update,
            format!("relationship type {} updated", id.simple()),
        )?;
        self.registry.save_and_commit(
            author,
            &message,
            RecordKind::RelationshipType,
            id,
            &relationship_type,
        )?;

        Ok(relationship_type)
    }

    /// Deletes a relationship type not referenced by any relationship.
    pub fn delete(&self, author: &Author, id: Uuid) -> AdminResult<()> {
        let _guard = self.registry.lock_for_write()?;

        let _existing: RelationshipType = self.registry.require(RecordKind::RelationshipType, id)?;
        let relationships: Vec<Relationship> = self.registry.list(RecordKind::Relationship)?;
        if relationships.iter().any(|rel| rel.type_id == id) {
            return Err(AdminError::InUse(
                "relationship type is referenced by existing relationships".into(),
            ));
        }

        let message = AuditMessage::new(
            RecordKind::RelationshipType.commit_domain(),
            CommitAction::Remove,
            format!("relationship type {} removed", id.simple()),
        )?;
        self.registry
            .remove_and_commit(author, &message, RecordKind::RelationshipType, id)
    }

    /// Relationship types whose age window covers a patient of the given age,
    /// ordered by name.
    pub fn valid_types_for_age(&self, age: u32) -> AdminResult<Vec<RelationshipType>> {
        let mut types: Vec<RelationshipType> = self
            .registry
            .list(RecordKind::RelationshipType)?
            .into_iter()
            .filter(|relationship_type: &RelationshipType| relationship_type.covers_age(age))
            .collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    /// Creates the predefined relationship types, skipping names that
    /// already exist. Returns the types created by this call.
    pub fn seed_defaults(&self, author: &Author) -> AdminResult<Vec<RelationshipType>> {
        let existing_names: Vec<String> = self
            .list()?
            .into_iter()
            .map(|relationship_type| relationship_type.name)
            .collect();

        let mut created = Vec::new();
        for input in default_types() {
            if existing_names.iter().any(|name| name == &input.name) {
                continue;
            }
            created.push(self.create(author, input)?);
        }
        Ok(created)
    }

    fn ensure_unique(
        &self,
        relationship_type: &RelationshipType,
        exclude: Option<Uuid>,
    ) -> AdminResult<()> {
        let others: Vec<RelationshipType> = self.registry.list(RecordKind::RelationshipType)?;
        for other in others.iter().filter(|other| Some(other.id) != exclude) {
            if other.name.eq_ignore_ascii_case(&relationship_type.name) {
                return Err(AdminError::Conflict(format!(
                    "a relationship type named '{}' already exists",
                    relationship_type.name
                )));
            }
            if relationship_type.role == RoleType::Self_ && other.role == RoleType::Self_ {
                return Err(AdminError::Conflict(
                    "a relationship type with the SELF role already exists".into(),
                ));
            }
        }
        Ok(())
    }
}

fn build_type(id: Uuid, input: RelationshipTypeInput) -> AdminResult<RelationshipType> {
    let name = NonEmptyText::new(&input.name)
        .map_err(|_| AdminError::InvalidInput("name cannot be empty".into()))?;

    if input.start_age >= RELATIONSHIP_MAX_AGE {
        return Err(AdminError::InvalidInput(format!(
            "start_age must be below {RELATIONSHIP_MAX_AGE}"
        )));
    }
    if let Some(end_age) = input.end_age {
        if end_age <= input.start_age || end_age > RELATIONSHIP_MAX_AGE {
            return Err(AdminError::InvalidInput(format!(
                "end_age must be greater than start_age and at most {RELATIONSHIP_MAX_AGE}"
            )));
        }
    }

    Ok(RelationshipType {
        id,
        name: name.as_str().to_owned(),
        description: input.description.trim().to_owned(),
        role: input.role,
        start_age: input.start_age,
        end_age: input.end_age,
        form_required: input.form_required,
        can_answer_questionnaire: input.can_answer_questionnaire,
        can_be_self_granted: input.can_be_self_granted,
    })
}

/// The predefined relationship types shipped with the platform.
fn default_types() -> Vec<RelationshipTypeInput> {
    vec![
        RelationshipTypeInput {
            name: "Self".into(),
            description: "The patient is the requestor and caregiver".into(),
            role: RoleType::Self_,
            start_age: 14,
            end_age: None,
            form_required: false,
            can_answer_questionnaire: true,
            can_be_self_granted: true,
        },
        RelationshipTypeInput {
            name: "Parent/Guardian".into(),
            description: "A parent or legal guardian of the patient".into(),
            role: RoleType::ParentGuardian,
            start_age: 0,
            end_age: Some(14),
            form_required: false,
            can_answer_questionnaire: true,
            can_be_self_granted: false,
        },
        RelationshipTypeInput {
            name: "Guardian-Caregiver".into(),
            description: "A guardian of a patient between 14 and 18 years of age".into(),
            role: RoleType::GuardianCaregiver,
            start_age: 14,
            end_age: Some(18),
            form_required: true,
            can_answer_questionnaire: true,
            can_be_self_granted: false,
        },
        RelationshipTypeInput {
            name: "Mandatary".into(),
            description: "A person holding a protection mandate for the patient".into(),
            role: RoleType::Mandatary,
            start_age: 0,
            end_age: None,
            form_required: true,
            can_answer_questionnaire: true,
            can_be_self_granted: false,
        },
    ]
}
