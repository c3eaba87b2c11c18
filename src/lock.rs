//! Advisory shared locking for the credential file.
//!
//! The file must stay stable for the duration of one lookup. Writers are
//! expected to hold an exclusive lock, so readers take a shared one with a
//! bounded exponential backoff. The sleep function is a parameter so tests
//! can run the full retry schedule without waiting.

use std::fs::File;
use std::io;
use std::time::Duration;

/// Retry schedule for acquiring the shared lock.
///
/// The default reproduces the historical schedule: four sleeps of 5, 10, 20
/// and 40 seconds between attempts, then one final try.
#[derive(Debug, Clone, Copy)]
pub struct LockPolicy {
    /// Attempts that are followed by a sleep on contention.
    pub attempts: u32,
    /// Sleep after the first contended attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after each contended attempt.
    pub multiplier: u32,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

/// Acquires a shared advisory lock on `file`, sleeping between contended
/// attempts according to `policy`.
///
/// Returns the final contention error if the budget runs out; other I/O
/// errors abort immediately.
pub fn acquire_shared(
    file: &File,
    policy: LockPolicy,
    mut sleep: impl FnMut(Duration),
) -> io::Result<()> {
    let contended_kind = fs2::lock_contended_error().kind();
    let mut delay = policy.base_delay;
    for _ in 0..policy.attempts {
        match fs2::FileExt::try_lock_shared(file) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == contended_kind => {
                sleep(delay);
                delay *= policy.multiplier;
            }
            Err(e) => return Err(e),
        }
    }
    fs2::FileExt::try_lock_shared(file)
}
