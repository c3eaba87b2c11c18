//! Passphrase verification against a flat-file credential store.
//!
//! The store is a text file of `username:hash` lines. Stored hashes may be
//! legacy single-block DES crypt, the block-chained "bigcrypt" extension for
//! long passphrases, MD5-crypt (including output of a historically broken
//! implementation), or any other modular format the `pwhash` work-alike
//! understands. The engine identifies the scheme from the stored hash alone,
//! recomputes the candidate and compares; it never writes to the store and
//! never retains a passphrase.

mod crypt;
mod error;
mod lock;
mod pwfile;

pub use crate::crypt::bigcrypt::bigcrypt;
pub use crate::crypt::md5::broken_md5_crypt;
pub use crate::crypt::{HashCheck, Scheme, check};
pub use crate::error::VerifyError;
pub use crate::lock::LockPolicy;
pub use crate::pwfile::PasswdFile;

use std::path::PathBuf;
use tracing::{debug, warn};

/// Definite result of one verification attempt.
///
/// `UserNotFound` and `WrongCredential` stay distinct here; whether to
/// collapse them for the outside world is the host's policy, not this
/// engine's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    WrongCredential,
    UserNotFound,
}

/// Engine configuration, abstracted from the host's flag surface.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    /// Take a shared advisory lock on the credential file per lookup.
    pub use_file_locking: bool,
    /// Retry with the bigcrypt chainer / broken MD5 variant when the
    /// platform path disagrees. On by default so stores written by legacy
    /// implementations keep working.
    pub legacy_compatibility: bool,
    /// Fail closed on records with an empty hash field instead of treating
    /// them as a configured "no password" state.
    pub disallow_empty_credential: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            use_file_locking: false,
            legacy_compatibility: true,
            disallow_empty_credential: false,
        }
    }
}

/// Verifies candidate passphrases against one credential file.
pub struct Verifier {
    pwfile: PasswdFile,
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, VerifyOptions::default())
    }

    pub fn with_options(path: impl Into<PathBuf>, options: VerifyOptions) -> Self {
        let mut pwfile = PasswdFile::new(path);
        if options.use_file_locking {
            pwfile = pwfile.with_locking(LockPolicy::default());
        }
        Self { pwfile, options }
    }

    /// Verifies `passphrase` for `username`.
    ///
    /// Errors mean the attempt could not be completed (store unreadable,
    /// lock budget exhausted) and must not be reported as a wrong
    /// credential.
    pub fn verify(&self, username: &str, passphrase: &str) -> Result<Outcome, VerifyError> {
        let Some(stored) = self.pwfile.lookup(username)? else {
            // burn one transform so a missing user costs roughly as much as
            // a wrong passphrase; stronger padding is the host's fail delay
            let _ = pwhash::unix_crypt::hash_with("xx", passphrase);
            return Ok(Outcome::UserNotFound);
        };

        if stored.is_empty() {
            debug!(user = username, "empty credential field");
            return Ok(if self.options.disallow_empty_credential {
                Outcome::WrongCredential
            } else {
                Outcome::Success
            });
        }

        match crypt::check(passphrase, &stored, self.options.legacy_compatibility) {
            HashCheck::Match => {
                debug!(user = username, "passphrase accepted");
                Ok(Outcome::Success)
            }
            HashCheck::Mismatch => {
                debug!(user = username, "passphrase rejected");
                Ok(Outcome::WrongCredential)
            }
            HashCheck::Unrecognized => {
                warn!(user = username, "stored hash matches no known scheme");
                Ok(Outcome::WrongCredential)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn write_pwfile(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("passwd");
        let mut f = File::create(&path).unwrap();
        write!(f, "{contents}").unwrap();
        path
    }

    #[test]
    fn bare_crypt_end_to_end() {
        let dir = tempdir().unwrap();
        let hash = pwhash::unix_crypt::hash_with("Ab", "secret").unwrap();
        let path = write_pwfile(&dir, &format!("alice:{hash}\n"));

        let verifier = Verifier::new(path);
        assert_eq!(verifier.verify("alice", "secret").unwrap(), Outcome::Success);
        assert_eq!(
            verifier.verify("alice", "wrong").unwrap(),
            Outcome::WrongCredential
        );
    }

    #[test]
    fn unknown_user_is_distinct_from_wrong_password() {
        let dir = tempdir().unwrap();
        let hash = pwhash::unix_crypt::hash_with("Ab", "secret").unwrap();
        let path = write_pwfile(&dir, &format!("alice:{hash}\n"));

        let verifier = Verifier::new(path);
        assert_eq!(
            verifier.verify("nouser", "anything").unwrap(),
            Outcome::UserNotFound
        );
        assert_eq!(
            verifier.verify("alice", "anything").unwrap(),
            Outcome::WrongCredential
        );
    }

    #[test]
    fn bigcrypt_end_to_end() {
        let dir = tempdir().unwrap();
        let pass = "a passphrase well past eight characters";
        let hash = bigcrypt(pass, "xO").unwrap();
        let path = write_pwfile(&dir, &format!("alice:{hash}\n"));

        let verifier = Verifier::new(&path);
        assert_eq!(verifier.verify("alice", pass).unwrap(), Outcome::Success);
        assert_eq!(
            verifier.verify("alice", "wrong passphrase entirely").unwrap(),
            Outcome::WrongCredential
        );

        // without legacy compatibility the chained hash no longer verifies
        let strict = Verifier::with_options(
            &path,
            VerifyOptions {
                legacy_compatibility: false,
                ..VerifyOptions::default()
            },
        );
        assert_eq!(strict.verify("alice", pass).unwrap(), Outcome::WrongCredential);
    }

    #[test]
    fn md5_good_hash_verifies_without_fallback() {
        let dir = tempdir().unwrap();
        // vector from the pwhash documentation
        let path = write_pwfile(&dir, "alice:$1$5pZSV9va$azfrPr6af3Fc7dLblQXVa0\n");

        let strict = Verifier::with_options(
            path,
            VerifyOptions {
                legacy_compatibility: false,
                ..VerifyOptions::default()
            },
        );
        assert_eq!(strict.verify("alice", "password").unwrap(), Outcome::Success);
    }

    #[test]
    fn md5_broken_hash_verifies_through_fallback() {
        let dir = tempdir().unwrap();
        let hash = broken_md5_crypt("password", "saltsalt");
        let path = write_pwfile(&dir, &format!("alice:{hash}\n"));

        let verifier = Verifier::new(&path);
        assert_eq!(verifier.verify("alice", "password").unwrap(), Outcome::Success);

        let strict = Verifier::with_options(
            &path,
            VerifyOptions {
                legacy_compatibility: false,
                ..VerifyOptions::default()
            },
        );
        assert_eq!(
            strict.verify("alice", "password").unwrap(),
            Outcome::WrongCredential
        );
    }

    #[test]
    fn empty_hash_field_follows_policy() {
        let dir = tempdir().unwrap();
        let path = write_pwfile(&dir, "bob:\n");

        let permissive = Verifier::new(&path);
        assert_eq!(permissive.verify("bob", "anything").unwrap(), Outcome::Success);

        let strict = Verifier::with_options(
            &path,
            VerifyOptions {
                disallow_empty_credential: true,
                ..VerifyOptions::default()
            },
        );
        assert_eq!(
            strict.verify("bob", "anything").unwrap(),
            Outcome::WrongCredential
        );
    }

    #[test]
    fn unrecognized_scheme_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_pwfile(&dir, "alice:?\n");

        let verifier = Verifier::new(path);
        assert_eq!(
            verifier.verify("alice", "anything").unwrap(),
            Outcome::WrongCredential
        );
    }

    #[test]
    fn missing_store_is_an_error() {
        let dir = tempdir().unwrap();
        let verifier = Verifier::new(dir.path().join("nope"));

        match verifier.verify("alice", "pw") {
            Err(VerifyError::StoreUnavailable { .. }) => (),
            other => panic!("expected StoreUnavailable, got: {other:?}"),
        }
    }
}
