//! Hash-scheme classification and comparison.
//!
//! A stored hash's structure alone determines the scheme that produced it:
//! a `$1$` marker means MD5-crypt, any other modular marker belongs to the
//! platform work-alike, and unmarked hashes are DES crypt (13 characters)
//! or bigcrypt (longer). The comparator first trusts `pwhash`'s adaptive
//! `crypt(3)` work-alike and, in legacy-compatibility mode, recomputes with
//! the bigcrypt chainer or the broken MD5 variant when that disagrees —
//! stores written by buggy implementations must keep working.

pub mod bigcrypt;
pub mod md5;

use crate::crypt::bigcrypt::{ESEGMENT_SIZE, SALT_SIZE, bigcrypt};
use crate::crypt::md5::{MAX_SALT_LEN, MD5_MAGIC, broken_md5_crypt};
use pwhash::unix;
use tracing::debug;

/// Hash scheme recognized from a stored credential's structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme<'a> {
    /// Single-block DES crypt; `salt` is the leading 2 characters.
    BareCrypt { salt: &'a str },
    /// Block-chained DES crypt; `salt` is the first segment's 2 characters.
    BigCrypt { salt: &'a str },
    /// `$1$`-prefixed MD5-crypt; `salt` is the bare salt, marker stripped.
    Md5Crypt { salt: &'a str },
    /// Some other modular format (`$2y$`, `$5$`, ...), left to the platform.
    Modular,
}

impl<'a> Scheme<'a> {
    /// Classifies a stored hash by prefix and length. `None` means no known
    /// scheme could have produced it.
    pub fn classify(stored: &'a str) -> Option<Self> {
        if stored.is_empty() || !stored.is_ascii() {
            return None;
        }
        if let Some(rest) = stored.strip_prefix(MD5_MAGIC) {
            let salt = rest.split('$').next().unwrap_or(rest);
            let salt = if salt.len() > MAX_SALT_LEN { &salt[..MAX_SALT_LEN] } else { salt };
            return Some(Scheme::Md5Crypt { salt });
        }
        if stored.starts_with('$') || stored.starts_with('_') {
            return Some(Scheme::Modular);
        }
        if stored.len() < SALT_SIZE {
            return None;
        }
        let salt = &stored[..SALT_SIZE];
        if stored.len() > SALT_SIZE + ESEGMENT_SIZE {
            Some(Scheme::BigCrypt { salt })
        } else {
            Some(Scheme::BareCrypt { salt })
        }
    }
}

/// Result of comparing a candidate passphrase against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashCheck {
    Match,
    Mismatch,
    /// The stored hash matches no known format. Never a success.
    Unrecognized,
}

/// Compares `passphrase` against `stored`.
///
/// The platform work-alike gets the first word; with `legacy_compatibility`
/// set, a disagreement triggers one silent recomputation: the bigcrypt
/// chainer for long DES hashes, the defect-preserving MD5 variant for `$1$`
/// hashes.
pub fn check(passphrase: &str, stored: &str, legacy_compatibility: bool) -> HashCheck {
    let Some(scheme) = Scheme::classify(stored) else {
        return HashCheck::Unrecognized;
    };

    if consteq(stored, unix::crypt(passphrase, stored)) {
        return HashCheck::Match;
    }

    if legacy_compatibility {
        let matched = match scheme {
            Scheme::Md5Crypt { salt } => {
                debug!("retrying with the broken MD5-crypt variant");
                consteq(stored, Ok(broken_md5_crypt(passphrase, salt)))
            }
            Scheme::BigCrypt { .. } => {
                debug!("retrying with bigcrypt chaining");
                // the stored hash doubles as the salt for re-derivation
                consteq(stored, bigcrypt(passphrase, stored))
            }
            Scheme::BareCrypt { .. } | Scheme::Modular => false,
        };
        if matched {
            return HashCheck::Match;
        }
    }

    HashCheck::Mismatch
}

/// Constant-time comparison of a stored hash with a computed candidate.
/// A failed computation compares unequal.
fn consteq(stored: &str, candidate: pwhash::Result<String>) -> bool {
    let Ok(candidate) = candidate else {
        return false;
    };
    if stored.len() != candidate.len() {
        return false;
    }
    stored
        .bytes()
        .zip(candidate.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwhash::unix_crypt;

    #[test]
    fn classify_md5_marker() {
        assert_eq!(
            Scheme::classify("$1$saltsalt$azfrPr6af3Fc7dLblQXVa0"),
            Some(Scheme::Md5Crypt { salt: "saltsalt" })
        );
        // salt bounded at 8 characters even without a closing delimiter
        assert_eq!(
            Scheme::classify("$1$averylongsaltvalue"),
            Some(Scheme::Md5Crypt { salt: "averylon" })
        );
    }

    #[test]
    fn classify_by_length() {
        assert_eq!(
            Scheme::classify("xOAFZqRz5RduI"),
            Some(Scheme::BareCrypt { salt: "xO" })
        );
        assert_eq!(
            Scheme::classify("xOAFZqRz5RduIAFZqRz5RduI"),
            Some(Scheme::BigCrypt { salt: "xO" })
        );
    }

    #[test]
    fn classify_other_modular_formats() {
        assert_eq!(Scheme::classify("$6$salt$hash"), Some(Scheme::Modular));
        assert_eq!(Scheme::classify("_obsolete"), Some(Scheme::Modular));
    }

    #[test]
    fn classify_rejects_garbage() {
        assert_eq!(Scheme::classify(""), None);
        assert_eq!(Scheme::classify("x"), None);
        assert_eq!(Scheme::classify("häsh"), None);
    }

    #[test]
    fn bare_crypt_matches() {
        let stored = unix_crypt::hash_with("Ab", "secret").unwrap();
        assert_eq!(check("secret", &stored, false), HashCheck::Match);
        assert_eq!(check("wrong", &stored, false), HashCheck::Mismatch);
    }

    #[test]
    fn md5_good_matches_without_legacy_mode() {
        // vector from the pwhash documentation
        let stored = "$1$5pZSV9va$azfrPr6af3Fc7dLblQXVa0";
        assert_eq!(check("password", stored, false), HashCheck::Match);
        assert_eq!(check("wrong", stored, false), HashCheck::Mismatch);
    }

    #[test]
    fn md5_broken_needs_legacy_mode() {
        let stored = broken_md5_crypt("password", "saltsalt");
        assert_eq!(check("password", &stored, false), HashCheck::Mismatch);
        assert_eq!(check("password", &stored, true), HashCheck::Match);
        assert_eq!(check("wrong", &stored, true), HashCheck::Mismatch);
    }

    #[test]
    fn bigcrypt_needs_legacy_mode() {
        let stored = bigcrypt("a passphrase well past eight", "xO").unwrap();
        assert_eq!(check("a passphrase well past eight", &stored, false), HashCheck::Mismatch);
        assert_eq!(check("a passphrase well past eight", &stored, true), HashCheck::Match);
        assert_eq!(check("a passphrase well past EIGHT", &stored, true), HashCheck::Mismatch);
    }

    #[test]
    fn unrecognized_is_never_a_match() {
        assert_eq!(check("anything", "?", true), HashCheck::Unrecognized);
        assert_eq!(check("", "ü", true), HashCheck::Unrecognized);
    }
}
