//! Defect-preserving MD5-crypt.
//!
//! Old credential files can hold `$1$` hashes produced by a buggy libcrypt
//! port. In that port the parity arms of the key-length bit loop were
//! swapped: where the reference algorithm feeds a zero byte it fed the first
//! passphrase byte, and vice versa. The hashes are format-compatible with
//! correct MD5-crypt but compare differently for any non-empty passphrase,
//! so the comparator keeps this variant around as a retry strategy.
//!
//! The correct variant is `pwhash::md5_crypt`; only the broken one lives
//! here.

use md5::{Digest, Md5};

pub(crate) const MD5_MAGIC: &str = "$1$";
/// Maximum salt length; longer salts are truncated.
pub const MAX_SALT_LEN: usize = 8;

const MD5_TRANSPOSE: &[u8; 16] =
    b"\x0c\x06\x00\x0d\x07\x01\x0e\x08\x02\x0f\x09\x03\x05\x0a\x04\x0b";
const CRYPT_HASH64: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Hashes `passphrase` with the defective MD5-crypt variant.
///
/// `salt` is the bare salt string without the `$1$` marker; at most
/// [`MAX_SALT_LEN`] characters are used. The result carries the usual
/// `$1${salt}${checksum}` form.
pub fn broken_md5_crypt(passphrase: &str, salt: &str) -> String {
    let pass = passphrase.as_bytes();
    let salt = salt.get(..MAX_SALT_LEN).unwrap_or(salt);

    let mut outer = Md5::new();
    outer.update(pass);
    outer.update(salt.as_bytes());
    outer.update(pass);
    let alternate = outer.finalize();

    let mut ctx = Md5::new();
    ctx.update(pass);
    ctx.update(MD5_MAGIC.as_bytes());
    ctx.update(salt.as_bytes());

    let mut plen = pass.len();
    while plen > 0 {
        ctx.update(&alternate[..plen.min(16)]);
        if plen < 16 {
            break;
        }
        plen -= 16;
    }

    // the defect: the reference algorithm feeds a zero byte on set bits and
    // the first passphrase byte on clear bits
    plen = pass.len();
    while plen > 0 {
        if plen & 1 == 1 {
            ctx.update(&pass[..1]);
        } else {
            ctx.update([0u8]);
        }
        plen >>= 1;
    }

    let mut digest = ctx.finalize_reset();

    for round in 0..1000 {
        if round % 2 == 1 {
            ctx.update(pass);
        } else {
            ctx.update(digest);
        }
        if round % 3 > 0 {
            ctx.update(salt.as_bytes());
        }
        if round % 7 > 0 {
            ctx.update(pass);
        }
        if round % 2 == 0 {
            ctx.update(pass);
        } else {
            ctx.update(digest);
        }
        digest = ctx.finalize_reset();
    }

    let mut transposed = [0u8; 16];
    for (i, &t) in MD5_TRANSPOSE.iter().enumerate() {
        transposed[i] = digest[t as usize];
    }

    format!("{}{}${}", MD5_MAGIC, salt, hash64_encode(&transposed))
}

/// Base64-like encoding used by the crypt family, little-endian in groups
/// of three bytes.
fn hash64_encode(bytes: &[u8]) -> String {
    let ngroups = bytes.len().div_ceil(3);
    let mut out = String::with_capacity(ngroups * 4);
    for group in 0..ngroups {
        let mut idx = group * 3;
        let mut enc = 0u32;
        for _ in 0..3 {
            let b = u32::from(if idx < bytes.len() { bytes[idx] } else { 0 });
            enc >>= 8;
            enc |= b << 16;
            idx += 1;
        }
        for _ in 0..4 {
            out.push(CRYPT_HASH64[(enc & 0x3f) as usize] as char);
            enc >>= 6;
        }
    }
    match bytes.len() % 3 {
        1 => {
            out.pop();
            out.pop();
        }
        2 => {
            out.pop();
        }
        _ => (),
    }
    out
}
