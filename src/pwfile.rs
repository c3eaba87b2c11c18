//! Credential-file lookup.
//!
//! One record per line, fields separated by `:`; the first field is the
//! username, the second the encoded hash, anything after a further `:` is
//! ignored. No header, no escaping, no ordering. The file is expected to be
//! small and read once per authentication attempt, so lookup is a plain
//! linear scan with first match winning.

use crate::error::VerifyError;
use crate::lock::{self, LockPolicy};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::debug;

/// Read-only handle on a flat credential file.
///
/// The engine never creates, mutates or deletes file content.
pub struct PasswdFile {
    path: PathBuf,
    locking: Option<LockPolicy>,
}

impl PasswdFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            locking: None,
        }
    }

    /// Takes a shared advisory lock for the duration of each lookup.
    pub fn with_locking(mut self, policy: LockPolicy) -> Self {
        self.locking = Some(policy);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored hash for `username`, or `None` when no record
    /// matches. A record without a `:` separator never matches.
    pub fn lookup(&self, username: &str) -> Result<Option<String>, VerifyError> {
        let file = File::open(&self.path).map_err(|source| VerifyError::StoreUnavailable {
            path: self.path.clone(),
            source,
        })?;

        if let Some(policy) = self.locking {
            // the lock is dropped with the file handle at the end of the scan
            lock::acquire_shared(&file, policy, thread::sleep).map_err(|source| {
                if source.kind() == fs2::lock_contended_error().kind() {
                    VerifyError::LockContention {
                        path: self.path.clone(),
                    }
                } else {
                    VerifyError::StoreUnavailable {
                        path: self.path.clone(),
                        source,
                    }
                }
            })?;
        }

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| VerifyError::StoreUnavailable {
                path: self.path.clone(),
                source,
            })?;
            let Some((user, rest)) = line.split_once(':') else {
                continue;
            };
            if user != username {
                continue;
            }
            let hash = rest.split(':').next().unwrap_or("");
            debug!(user = username, "credential record found");
            return Ok(Some(hash.to_string()));
        }

        debug!(user = username, "no credential record");
        Ok(None)
    }
}
