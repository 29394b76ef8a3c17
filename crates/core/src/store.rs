//! Typed JSON record storage inside the registry directory.
//!
//! Every record kind lives in its own subdirectory; each record is one
//! pretty-printed JSON file named after its UUID:
//!
//! ```text
//! registry/
//!   patients/<uuid>.json
//!   relationships/<uuid>.json
//!   ...
//!   .git/                 # audit history (see `audit` module)
//! ```
//!
//! Functions here are pure file operations; locking and audit commits are
//! the `Registry`'s responsibility.

use crate::audit::CommitDomain;
use crate::{AdminError, AdminResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// The kinds of records held in the registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RecordKind {
    Institution,
    Site,
    Patient,
    Caregiver,
    RelationshipType,
    Relationship,
    RegistrationCode,
}

impl RecordKind {
    /// Subdirectory of the registry holding this kind.
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Institution => "institutions",
            Self::Site => "sites",
            Self::Patient => "patients",
            Self::Caregiver => "caregivers",
            Self::RelationshipType => "relationship_types",
            Self::Relationship => "relationships",
            Self::RegistrationCode => "registration_codes",
        }
    }

    /// Human-readable singular name, used in error messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Site => "site",
            Self::Patient => "patient",
            Self::Caregiver => "caregiver",
            Self::RelationshipType => "relationship type",
            Self::Relationship => "relationship",
            Self::RegistrationCode => "registration code",
        }
    }

    /// The audit commit domain for mutations of this kind.
    pub const fn commit_domain(self) -> CommitDomain {
        match self {
            Self::Institution => CommitDomain::Institution,
            Self::Site => CommitDomain::Site,
            Self::Patient => CommitDomain::Patient,
            Self::Caregiver => CommitDomain::Caregiver,
            Self::RelationshipType => CommitDomain::RelationshipType,
            Self::Relationship => CommitDomain::Relationship,
            Self::RegistrationCode => CommitDomain::RegistrationCode,
        }
    }
}

/// Path of a record file relative to the registry root.
pub fn relative_path(kind: RecordKind, id: Uuid) -> PathBuf {
    Path::new(kind.dir_name()).join(format!("{}.json", id.simple()))
}

/// Writes a record file, creating the kind directory on first use.
///
/// Returns the path of the written file relative to the registry root, for
/// staging in the audit commit.
///
/// # Errors
///
/// Returns `AdminError::StorageDirCreation`, `Serialization`, or `FileWrite`.
pub fn save<T: Serialize>(
    registry_dir: &Path,
    kind: RecordKind,
    id: Uuid,
    record: &T,
) -> AdminResult<PathBuf> {
    let relative = relative_path(kind, id);
    let absolute = registry_dir.join(&relative);

    if let Some(parent) = absolute.parent() {
        fs::create_dir_all(parent).map_err(AdminError::StorageDirCreation)?;
    }

    let json = serde_json::to_vec_pretty(record).map_err(AdminError::Serialization)?;
    fs::write(&absolute, json).map_err(AdminError::FileWrite)?;

    Ok(relative)
}

/// Reads a record file, returning `None` when it does not exist.
///
/// # Errors
///
/// Returns `AdminError::FileRead` or `Deserialization`.
pub fn load<T: DeserializeOwned>(
    registry_dir: &Path,
    kind: RecordKind,
    id: Uuid,
) -> AdminResult<Option<T>> {
    let absolute = registry_dir.join(relative_path(kind, id));

    let contents = match fs::read_to_string(&absolute) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(AdminError::FileRead(e)),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(AdminError::Deserialization)
}

/// Reads a record file, failing with `AdminError::NotFound` when absent.
pub fn require<T: DeserializeOwned>(
    registry_dir: &Path,
    kind: RecordKind,
    id: Uuid,
) -> AdminResult<T> {
    load(registry_dir, kind, id)?.ok_or_else(|| AdminError::NotFound {
        kind: kind.display_name(),
        id: id.to_string(),
    })
}

/// Reads all records of a kind.
///
/// Files that fail to parse are logged as warnings and skipped, so one
/// corrupt record does not take down every listing.
///
/// # Errors
///
/// Returns `AdminError::FileRead` only for directory traversal failures; a
/// missing kind directory yields an empty list.
pub fn list<T: DeserializeOwned>(registry_dir: &Path, kind: RecordKind) -> AdminResult<Vec<T>> {
    let dir = registry_dir.join(kind.dir_name());

    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AdminError::FileRead(e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry.map_err(AdminError::FileRead)?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            continue;
        }

        let contents = fs::read_to_string(&path).map_err(AdminError::FileRead)?;
        match serde_json::from_str(&contents) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("failed to parse record {}: {}", path.display(), e);
            }
        }
    }

    Ok(records)
}

/// Deletes a record file from the working tree.
///
/// Returns the relative path for staging the removal in the audit commit.
///
/// # Errors
///
/// Returns `AdminError::NotFound` when the file does not exist and
/// `FileRemove` for other I/O failures.
pub fn remove(registry_dir: &Path, kind: RecordKind, id: Uuid) -> AdminResult<PathBuf> {
    let relative = relative_path(kind, id);
    let absolute = registry_dir.join(&relative);

    match fs::remove_file(&absolute) {
        Ok(()) => Ok(relative),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AdminError::NotFound {
            kind: kind.display_name(),
            id: id.to_string(),
        }),
        Err(e) => Err(AdminError::FileRemove(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct TestRecord {
        id: Uuid,
        name: String,
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let record = TestRecord {
            id,
            name: "General Hospital".into(),
        };

        let relative = save(temp.path(), RecordKind::Institution, id, &record).unwrap();
        assert_eq!(
            relative,
            Path::new("institutions").join(format!("{}.json", id.simple()))
        );

        let loaded: TestRecord = require(temp.path(), RecordKind::Institution, id).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn load_missing_record_returns_none() {
        let temp = TempDir::new().unwrap();
        let loaded: Option<TestRecord> =
            load(temp.path(), RecordKind::Patient, Uuid::new_v4()).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn require_missing_record_fails_with_not_found() {
        let temp = TempDir::new().unwrap();
        let err = require::<TestRecord>(temp.path(), RecordKind::Patient, Uuid::new_v4())
            .expect_err("missing record should fail");
        assert!(matches!(err, AdminError::NotFound { kind: "patient", .. }));
    }

    #[test]
    fn list_of_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let records: Vec<TestRecord> = list(temp.path(), RecordKind::Caregiver).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn list_skips_unparseable_files() {
        let temp = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let record = TestRecord {
            id,
            name: "Valid".into(),
        };
        save(temp.path(), RecordKind::Caregiver, id, &record).unwrap();

        let dir = temp.path().join(RecordKind::Caregiver.dir_name());
        fs::write(dir.join("broken.json"), "not json {{{").unwrap();

        let records: Vec<TestRecord> = list(temp.path(), RecordKind::Caregiver).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Valid");
    }

    #[test]
    fn remove_deletes_the_file() {
        let temp = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        let record = TestRecord {
            id,
            name: "Removable".into(),
        };
        save(temp.path(), RecordKind::Site, id, &record).unwrap();

        remove(temp.path(), RecordKind::Site, id).unwrap();
        let loaded: Option<TestRecord> = load(temp.path(), RecordKind::Site, id).unwrap();
        assert!(loaded.is_none());
    }
}
