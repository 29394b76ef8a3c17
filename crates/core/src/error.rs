use opal_types::{RegistrationCodeStatus, RelationshipStatus};

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("cannot delete: {0}")]
    InUse(String),
    #[error("invalid relationship status transition: {from} -> {to}")]
    InvalidTransition {
        from: RelationshipStatus,
        to: RelationshipStatus,
    },
    #[error("a reason is mandatory when setting status {0}")]
    ReasonRequired(RelationshipStatus),
    #[error("patient is deceased")]
    DeceasedPatient,
    #[error(
        "patient age {age} is outside the authorised window of relationship type '{type_name}'"
    )]
    AgeOutsideTypeWindow { age: u32, type_name: String },
    #[error("registration code is not usable (status: {status})")]
    CodeNotUsable { status: RegistrationCodeStatus },
    #[error("email verification code mismatch ({attempts_remaining} attempt(s) remaining)")]
    VerificationMismatch { attempts_remaining: u32 },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to remove record file: {0}")]
    FileRemove(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),

    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to remove file from git index: {0}")]
    GitRemove(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to walk git history: {0}")]
    GitLog(git2::Error),

    #[error("registry write lock poisoned")]
    LockPoisoned,
}

pub type AdminResult<T> = std::result::Result<T, AdminError>;
