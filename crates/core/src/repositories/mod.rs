//! Repository services for the registry record kinds.
//!
//! Each service owns the validation and audit-commit logic for one slice of
//! the domain. All mutations run under the registry write lock so that
//! cross-record invariants hold.

pub mod caregivers;
pub mod hospital;
pub mod patients;
pub mod registration;
pub mod relationship_types;
pub mod relationships;

pub use caregivers::CaregiverService;
pub use hospital::HospitalService;
pub use patients::PatientService;
pub use registration::RegistrationService;
pub use relationship_types::RelationshipTypeService;
pub use relationships::{RelationshipFilter, RelationshipService};
