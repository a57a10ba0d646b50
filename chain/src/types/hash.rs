//! 256-bit hash wrapper used for transaction ids, block hashes, and the
//! address-derivation pipeline.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of all 256-bit hash types used in this crate.
pub const HASH_LEN: usize = 32;

/// Strongly-typed 256-bit hash wrapper (SHA-256).
///
/// Used as the backing representation for transaction ids, block hashes, and
/// intermediate digests in address derivation. Always exactly [`HASH_LEN`]
/// bytes.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero sentinel used as `previous_hash` for the genesis block.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Computes a new [`Hash256`] as the SHA-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    /// Double SHA-256, used for address checksums.
    pub fn compute_double(data: &[u8]) -> Self {
        Self::compute(Self::compute(data).as_bytes())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Hex-encodes the hash (lowercase, no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded hash.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != HASH_LEN {
            return None;
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&bytes);
        Some(Hash256(out))
    }

    /// Interprets the hash as a big-endian 256-bit unsigned integer, for use
    /// as the seed in stake-weighted proposer selection.
    pub fn as_u256_mod(&self, modulus: u128) -> u128 {
        if modulus == 0 {
            return 0;
        }
        // Fold the 32 bytes into a u128 accumulator via repeated
        // multiply-and-add modulo `modulus`, avoiding a bignum dependency.
        let mut acc: u128 = 0;
        for byte in self.0 {
            acc = (acc.wrapping_mul(256) + byte as u128) % modulus;
        }
        acc
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compute_is_deterministic() {
        let a = Hash256::compute(b"hello");
        let b = Hash256::compute(b"hello");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn hex_roundtrip() {
        let h = Hash256::compute(b"grishinium");
        let hex = h.to_hex();
        let parsed = Hash256::from_hex(&hex).expect("valid hex");
        assert_eq!(h.as_bytes(), parsed.as_bytes());
    }

    #[test]
    fn as_u256_mod_is_stable_and_in_range() {
        let h = Hash256::compute(b"seed");
        let r1 = h.as_u256_mod(97);
        let r2 = h.as_u256_mod(97);
        assert_eq!(r1, r2);
        assert!(r1 < 97);
    }
}
