use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failures that make a verification attempt impossible to complete.
///
/// These are deliberately separate from [`crate::Outcome`]: a host must be
/// able to report "authentication service unavailable" instead of claiming
/// the supplied secret was wrong.
#[derive(Debug)]
pub enum VerifyError {
    /// The credential file could not be opened or read.
    StoreUnavailable { path: PathBuf, source: io::Error },
    /// The advisory lock on the credential file was not acquired within the
    /// retry budget.
    LockContention { path: PathBuf },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::StoreUnavailable { path, source } => {
                write!(f, "credential file '{}' unavailable: {source}", path.display())
            }
            VerifyError::LockContention { path } => {
                write!(f, "could not lock credential file '{}'", path.display())
            }
        }
    }
}

impl std::error::Error for VerifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VerifyError::StoreUnavailable { source, .. } => Some(source),
            VerifyError::LockContention { .. } => None,
        }
    }
}
