//! Segmented DES crypt chaining ("bigcrypt").
//!
//! Extends the single-block Unix crypt to passphrases longer than eight
//! characters: the cleartext is split into segments of up to eight bytes,
//! each encoded with a regular crypt call, and the encoded block of one
//! segment (salt stripped) becomes the salt of the next. The result is the
//! first segment's full 13-character output followed by the bare 11-character
//! blocks of every further segment.

use pwhash::unix_crypt;

/// Cleartext bytes per segment.
pub const SEGMENT_SIZE: usize = 8;
/// Salt characters at the front of an encoded hash.
pub const SALT_SIZE: usize = 2;
/// Encoded characters contributed by one segment.
pub const ESEGMENT_SIZE: usize = 11;
/// Segment cap; passphrase bytes beyond `MAX_SEGMENTS * SEGMENT_SIZE` are ignored.
pub const MAX_SEGMENTS: usize = 16;
/// Maximum number of significant passphrase bytes (128).
pub const MAX_PASS_LEN: usize = MAX_SEGMENTS * SEGMENT_SIZE;

/// Hashes `passphrase` with the bigcrypt chaining scheme.
///
/// `salt` is either a bare 2-character salt or a previously encoded hash;
/// passing a stored hash back in re-derives it for comparison. A salt of
/// exactly one block's encoded length (13 characters) forces a single
/// segment, so the function degrades to ordinary crypt for conventional
/// hashes regardless of passphrase length.
///
/// Returns an owned string of `2 + 11 * n_seg` characters. Errors from the
/// underlying crypt primitive (short salt, characters outside the hash
/// alphabet) are propagated.
pub fn bigcrypt(passphrase: &str, salt: &str) -> pwhash::Result<String> {
    let pass = passphrase.as_bytes();
    let pass = &pass[..pass.len().min(MAX_PASS_LEN)];

    let n_seg = if salt.len() == SALT_SIZE + ESEGMENT_SIZE || pass.is_empty() {
        1
    } else {
        pass.len().div_ceil(SEGMENT_SIZE)
    };

    // first segment is plain crypt and keeps its salt prefix
    let first = pass.len().min(SEGMENT_SIZE);
    let mut out = unix_crypt::hash_with(salt, &pass[..first])?;

    for seg in 1..n_seg {
        // previous segment's block, without the 2 salt characters, salts this one
        let block = SALT_SIZE + (seg - 1) * ESEGMENT_SIZE;
        let chain_salt = out[block..block + ESEGMENT_SIZE].to_string();

        let start = seg * SEGMENT_SIZE;
        let end = (start + SEGMENT_SIZE).min(pass.len());
        let encoded = unix_crypt::hash_with(&chain_salt, &pass[start..end])?;
        out.push_str(&encoded[SALT_SIZE..]);
    }

    Ok(out)
}
