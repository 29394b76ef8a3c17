//! Git-backed audit trail for the record registry.
//!
//! opaladmin stores every record as a JSON file inside a single registry
//! directory that is a local Git repository (`git2`/libgit2). Every create,
//! update, or delete is a commit carrying the author identity of the
//! administrator (or the system identity for sweep-driven changes), so the
//! Git history is the audit log required for relationship records.
//!
//! ## Branch policy
//!
//! The registry standardises on `refs/heads/main`; commits go through `HEAD`
//! so the branch follows every mutation.
//!
//! ## Commit messages
//!
//! Messages use a controlled vocabulary: `<domain>/<action>: <summary>`.
//! Record identifiers are allowed in summaries; patient names and other
//! personal data are not.

use crate::{AdminError, AdminResult, Author};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

const INITIAL_HEAD: &str = "main";

/// Controlled vocabulary for audit commit domains.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CommitDomain {
    Institution,
    Site,
    Patient,
    Caregiver,
    RelationshipType,
    Relationship,
    RegistrationCode,
}

impl CommitDomain {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Site => "site",
            Self::Patient => "patient",
            Self::Caregiver => "caregiver",
            Self::RelationshipType => "relationship-type",
            Self::Relationship => "relationship",
            Self::RegistrationCode => "registration-code",
        }
    }
}

impl fmt::Display for CommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled vocabulary for audit commit actions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CommitAction {
    Create,
    Update,
    Remove,
    Confirm,
    Deny,
    Revoke,
    Expire,
    Register,
    Block,
}

impl CommitAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Confirm => "confirm",
            Self::Deny => "deny",
            Self::Revoke => "revoke",
            Self::Expire => "expire",
            Self::Register => "register",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated audit commit message.
#[derive(Clone, Debug)]
pub struct AuditMessage {
    domain: CommitDomain,
    action: CommitAction,
    summary: String,
}

impl AuditMessage {
    /// Creates a message, rejecting blank or multi-line summaries.
    pub fn new(
        domain: CommitDomain,
        action: CommitAction,
        summary: impl Into<String>,
    ) -> AdminResult<Self> {
        let summary = summary.into();
        let trimmed = summary.trim();
        if trimmed.is_empty() {
            return Err(AdminError::InvalidInput(
                "audit summary cannot be empty".into(),
            ));
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(AdminError::InvalidInput(
                "audit summary must be a single line".into(),
            ));
        }
        Ok(Self {
            domain,
            action,
            summary: trimmed.to_owned(),
        })
    }

    pub fn render(&self) -> String {
        format!("{}/{}: {}", self.domain, self.action, self.summary)
    }
}

/// One entry of the audit history.
#[derive(Clone, Debug)]
pub struct AuditEntry {
    /// Abbreviated commit id.
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub time: DateTime<Utc>,
}

/// Handle on the registry's Git repository.
pub struct AuditRepo {
    repo: git2::Repository,
}

impl AuditRepo {
    /// Opens the registry repository, initialising it on first use.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::GitInit`/`GitOpen` when libgit2 cannot create or
    /// open the repository.
    pub fn open_or_init(registry_dir: &Path) -> AdminResult<Self> {
        let repo = if registry_dir.join(".git").is_dir() {
            git2::Repository::open(registry_dir).map_err(AdminError::GitOpen)?
        } else {
            let mut opts = git2::RepositoryInitOptions::new();
            opts.initial_head(INITIAL_HEAD);
            git2::Repository::init_opts(registry_dir, &opts).map_err(AdminError::GitInit)?
        };
        Ok(Self { repo })
    }

    /// Stages the given paths (relative to the registry root) and commits
    /// them with the author identity and message.
    ///
    /// `added` paths must exist in the working tree; `removed` paths must
    /// already be deleted from it.
    ///
    /// # Errors
    ///
    /// Returns the corresponding `AdminError::Git*` variant when staging,
    /// tree writing, or commit creation fails.
    pub fn commit(
        &self,
        author: &Author,
        message: &AuditMessage,
        added: &[&Path],
        removed: &[&Path],
    ) -> AdminResult<()> {
        let mut index = self.repo.index().map_err(AdminError::GitIndex)?;
        for path in added {
            index.add_path(path).map_err(AdminError::GitAdd)?;
        }
        for path in removed {
            index.remove_path(path).map_err(AdminError::GitRemove)?;
        }
        index.write().map_err(AdminError::GitIndex)?;

        let tree_id = index.write_tree().map_err(AdminError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(AdminError::GitFindTree)?;

        let signature = git2::Signature::now(author.name.as_str(), author.email.as_str())
            .map_err(AdminError::GitSignature)?;

        // First commit has no parent; later commits chain onto HEAD.
        let head_commit = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit().map_err(AdminError::GitHead)?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit<'_>> = head_commit.iter().collect();

        self.repo
            .commit(
                Some("HEAD"),
                &signature,
                &signature,
                &message.render(),
                &tree,
                &parents,
            )
            .map_err(AdminError::GitCommit)?;

        Ok(())
    }

    /// Returns the most recent audit entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::GitLog` when history traversal fails. An empty
    /// repository yields an empty list.
    pub fn history(&self, limit: usize) -> AdminResult<Vec<AuditEntry>> {
        if self.repo.head().is_err() {
            return Ok(Vec::new());
        }

        let mut revwalk = self.repo.revwalk().map_err(AdminError::GitLog)?;
        revwalk.push_head().map_err(AdminError::GitLog)?;

        let mut entries = Vec::new();
        for oid in revwalk.take(limit) {
            let oid = oid.map_err(AdminError::GitLog)?;
            let commit = self.repo.find_commit(oid).map_err(AdminError::GitLog)?;
            let author = commit.author();
            entries.push(AuditEntry {
                id: oid.to_string()[..12].to_string(),
                author_name: author.name().unwrap_or_default().to_string(),
                author_email: author.email().unwrap_or_default().to_string(),
                message: commit.summary().unwrap_or_default().to_string(),
                time: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0)
                    .unwrap_or_default(),
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn test_author() -> Author {
        Author::new("Test Admin", "admin@hospital.example").unwrap()
    }

    #[test]
    fn message_renders_domain_action_summary() {
        let message = AuditMessage::new(
            CommitDomain::Relationship,
            CommitAction::Confirm,
            "relationship 1234 confirmed",
        )
        .unwrap();
        assert_eq!(
            message.render(),
            "relationship/confirm: relationship 1234 confirmed"
        );
    }

    #[test]
    fn message_rejects_blank_summary() {
        let err = AuditMessage::new(CommitDomain::Patient, CommitAction::Create, "  ")
            .expect_err("blank summary should be rejected");
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }

    #[test]
    fn message_rejects_multi_line_summary() {
        let err = AuditMessage::new(CommitDomain::Patient, CommitAction::Create, "a\nb")
            .expect_err("multi-line summary should be rejected");
        assert!(matches!(err, AdminError::InvalidInput(_)));
    }

    #[test]
    fn open_or_init_creates_repository() {
        let temp = TempDir::new().unwrap();
        let registry_dir = temp.path().join("registry");
        fs::create_dir_all(&registry_dir).unwrap();

        let _repo = AuditRepo::open_or_init(&registry_dir).expect("init should succeed");
        assert!(registry_dir.join(".git").is_dir());

        // Opening again must not reinitialise.
        let _repo = AuditRepo::open_or_init(&registry_dir).expect("open should succeed");
    }

    #[test]
    fn commit_records_author_and_message() {
        let temp = TempDir::new().unwrap();
        let registry_dir = temp.path().join("registry");
        fs::create_dir_all(&registry_dir).unwrap();

        let repo = AuditRepo::open_or_init(&registry_dir).unwrap();
        fs::write(registry_dir.join("record.json"), "{}").unwrap();

        let message = AuditMessage::new(
            CommitDomain::Patient,
            CommitAction::Create,
            "patient abcd created",
        )
        .unwrap();
        repo.commit(
            &test_author(),
            &message,
            &[Path::new("record.json")],
            &[],
        )
        .expect("commit should succeed");

        let history = repo.history(10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].author_name, "Test Admin");
        assert_eq!(history[0].message, "patient/create: patient abcd created");
    }

    #[test]
    fn history_is_newest_first() {
        let temp = TempDir::new().unwrap();
        let registry_dir = temp.path().join("registry");
        fs::create_dir_all(&registry_dir).unwrap();

        let repo = AuditRepo::open_or_init(&registry_dir).unwrap();
        for n in 0..3 {
            let name = format!("record-{n}.json");
            fs::write(registry_dir.join(&name), "{}").unwrap();
            let message = AuditMessage::new(
                CommitDomain::Patient,
                CommitAction::Create,
                format!("patient {n} created"),
            )
            .unwrap();
            repo.commit(&test_author(), &message, &[Path::new(&name)], &[])
                .unwrap();
        }

        let history = repo.history(10).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message, "patient/create: patient 2 created");
        assert_eq!(history[2].message, "patient/create: patient 0 created");
    }

    #[test]
    fn history_of_empty_repository_is_empty() {
        let temp = TempDir::new().unwrap();
        let registry_dir = temp.path().join("registry");
        fs::create_dir_all(&registry_dir).unwrap();

        let repo = AuditRepo::open_or_init(&registry_dir).unwrap();
        assert!(repo.history(10).unwrap().is_empty());
    }
}
