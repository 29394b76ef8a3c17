//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! core services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent
//! behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{REGISTRATION_ATTEMPT_LIMIT, REGISTRY_DIR_NAME};
use crate::{AdminResult, Author};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    registration_attempt_limit: u32,
    system_author: Author,
}

impl CoreConfig {
    /// Create a new `CoreConfig` rooted at the given data directory.
    pub fn new(data_dir: PathBuf) -> AdminResult<Self> {
        Ok(Self {
            data_dir,
            registration_attempt_limit: REGISTRATION_ATTEMPT_LIMIT,
            system_author: Author::system(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the versioned record registry.
    pub fn registry_dir(&self) -> PathBuf {
        self.data_dir.join(REGISTRY_DIR_NAME)
    }

    /// Failed verification attempts before a registration code is blocked.
    pub fn registration_attempt_limit(&self) -> u32 {
        self.registration_attempt_limit
    }

    /// Author identity used for commits not attributable to a request
    /// (sweep expiries, lazy code expiry).
    pub fn system_author(&self) -> &Author {
        &self.system_author
    }
}
