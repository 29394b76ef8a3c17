//! # Opal Core
//!
//! Domain logic of the opaladmin backend: the versioned record registry, the
//! repository services that mutate it, request-time access control and the
//! daily expiry sweep.
//!
//! Records are stored as JSON files inside a git repository; every mutation
//! is one commit carrying the acting administrator's identity, so the commit
//! history doubles as the audit log. See the `registry`, `store` and `audit`
//! modules for the storage layer and `repositories` for the domain services
//! built on top of it.

pub mod access;
pub mod audit;
pub mod author;
pub mod config;
pub mod constants;
pub mod error;
pub mod registry;
pub mod repositories;
pub mod store;
pub mod sweep;
pub mod validation;

pub use access::{evaluate_patient_access, AccessDecision, AccessDenial, AccessGrant};
pub use audit::AuditEntry;
pub use author::Author;
pub use config::CoreConfig;
pub use error::{AdminError, AdminResult};
pub use registry::Registry;
pub use repositories::{
    CaregiverService, HospitalService, PatientService, RegistrationService, RelationshipFilter,
    RelationshipService, RelationshipTypeService,
};
pub use sweep::{run_sweep, SweepOutcome};

// Re-exported so dependants do not need a direct opal-types dependency for
// the common enums.
pub use opal_types::{RegistrationCodeStatus, RelationshipStatus};
