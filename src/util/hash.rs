//! Hashing helpers: FNV-1a over bytes, an ASCII case-insensitive variant, and
//! a SHA-256 digest convenience.
//!
//! The case-fold table is a process-wide, lazily initialized, immutable
//! lookup: built once on first use and shared read-only afterwards.

use std::hash::Hasher;

use lazy_static::lazy_static;
use sha2::{Digest, Sha256};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

lazy_static! {
    /// Maps every byte to its ASCII-uppercase form; non-ASCII bytes map to
    /// themselves.
    static ref CASE_FOLD: [u8; 256] = {
        let mut table = [0u8; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = (i as u8).to_ascii_uppercase();
        }
        table
    };
}

/// FNV-1a hash of `bytes`.
#[inline]
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a hash of `text` with ASCII case folded away: `"Key"` and `"KEY"`
/// hash identically. Non-ASCII bytes participate unchanged.
pub fn ascii_ci_hash(text: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in text.as_bytes() {
        hash ^= u64::from(CASE_FOLD[b as usize]);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// SHA-256 digest of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// [`Hasher`] adapter over [`fnv1a`], for use with `std::hash::Hash` keys.
#[derive(Debug, Clone)]
pub struct Fnv1aHasher(u64);

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Fnv1aHasher(FNV_OFFSET)
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }
}
