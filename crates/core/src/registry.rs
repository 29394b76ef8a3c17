//! The record registry shared by all repository services.
//!
//! `Registry` couples the storage directory with a process-wide write lock.
//! Reads go straight to the file store; mutations take the lock, write the
//! record file(s), and create one audit commit. The lock serialises
//! read-modify-write sequences so cross-record invariants (duplicate active
//! relationships, unique acronyms, MRN uniqueness) hold without a database.

use crate::audit::{AuditEntry, AuditMessage, AuditRepo};
use crate::store::{self, RecordKind};
use crate::{AdminError, AdminResult, Author, CoreConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Shared handle on the record registry.
#[derive(Clone)]
pub struct Registry {
    cfg: Arc<CoreConfig>,
    write_lock: Arc<Mutex<()>>,
}

impl Registry {
    /// Opens the registry, creating the directory and the audit repository
    /// on first use.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::StorageDirCreation` or a `Git*` variant when the
    /// directory or repository cannot be set up.
    pub fn open(cfg: Arc<CoreConfig>) -> AdminResult<Self> {
        let registry_dir = cfg.registry_dir();
        std::fs::create_dir_all(&registry_dir).map_err(AdminError::StorageDirCreation)?;
        AuditRepo::open_or_init(&registry_dir)?;

        Ok(Self {
            cfg,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn cfg(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.cfg.registry_dir()
    }

    /// Acquires the process-wide write lock.
    ///
    /// Held for the duration of a mutation, including its audit commit.
    pub(crate) fn lock_for_write(&self) -> AdminResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| AdminError::LockPoisoned)
    }

    /// Reads a record, returning `None` when absent.
    pub fn load<T: DeserializeOwned>(&self, kind: RecordKind, id: Uuid) -> AdminResult<Option<T>> {
        store::load(&self.registry_dir(), kind, id)
    }

    /// Reads a record, failing with `NotFound` when absent.
    pub fn require<T: DeserializeOwned>(&self, kind: RecordKind, id: Uuid) -> AdminResult<T> {
        store::require(&self.registry_dir(), kind, id)
    }

    /// Reads all records of a kind.
    pub fn list<T: DeserializeOwned>(&self, kind: RecordKind) -> AdminResult<Vec<T>> {
        store::list(&self.registry_dir(), kind)
    }

    /// Writes a record file without committing.
    ///
    /// Callers staging multi-record mutations collect the returned relative
    /// paths and pass them to [`Registry::commit`] in one batch; the write
    /// lock must be held across the whole sequence.
    pub(crate) fn save<T: Serialize>(
        &self,
        kind: RecordKind,
        id: Uuid,
        record: &T,
    ) -> AdminResult<PathBuf> {
        store::save(&self.registry_dir(), kind, id, record)
    }

    /// Deletes a record file without committing; see [`Registry::save`].
    pub(crate) fn remove(&self, kind: RecordKind, id: Uuid) -> AdminResult<PathBuf> {
        store::remove(&self.registry_dir(), kind, id)
    }

    /// Creates one audit commit for previously written/removed record files.
    pub(crate) fn commit(
        &self,
        author: &Author,
        message: &AuditMessage,
        added: &[&Path],
        removed: &[&Path],
    ) -> AdminResult<()> {
        let repo = AuditRepo::open_or_init(&self.registry_dir())?;
        repo.commit(author, message, added, removed)
    }

    /// Writes a single record and commits it in one step.
    pub(crate) fn save_and_commit<T: Serialize>(
        &self,
        author: &Author,
        message: &AuditMessage,
        kind: RecordKind,
        id: Uuid,
        record: &T,
    ) -> AdminResult<()> {
        let relative = self.save(kind, id, record)?;
        self.commit(author, message, &[relative.as_path()], &[])
    }

    /// Removes a single record and commits the removal in one step.
    pub(crate) fn remove_and_commit(
        &self,
        author: &Author,
        message: &AuditMessage,
        kind: RecordKind,
        id: Uuid,
    ) -> AdminResult<()> {
        let relative = self.remove(kind, id)?;
        self.commit(author, message, &[], &[relative.as_path()])
    }

    /// Returns the most recent audit entries, newest first.
    pub fn audit_history(&self, limit: usize) -> AdminResult<Vec<AuditEntry>> {
        let repo = AuditRepo::open_or_init(&self.registry_dir())?;
        repo.history(limit)
    }
}
