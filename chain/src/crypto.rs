//! Cryptographic primitives: keypair generation, address derivation,
//! canonical serialization, and ECDSA signing/verification.
//!
//! This module is deliberately stateless: every function takes its inputs
//! explicitly and returns a value or a [`CryptoError`]; there is no global
//! key storage or configuration here.
//!
//! Signatures are recoverable (65 bytes: a 64-byte compact signature plus a
//! one-byte recovery id). This lets a verifier recover the signer's public
//! key directly from the signature and the message, so a transaction need
//! only carry its address, not a separate public key field.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde::Serialize;
use thiserror::Error;

use crate::types::{ADDRESS_PREFIX, Address, Hash256};

/// Errors produced by key generation, parsing, or signing.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed secret key material")]
    BadSecretKey,
    #[error("malformed public key material")]
    BadPublicKey,
    #[error("malformed signature material")]
    BadSignature,
    #[error("failed to serialize value for canonical encoding: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// An ECDSA keypair over secp256k1.
pub struct Keypair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generates a new random keypair.
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Keypair {
            secret_key,
            public_key,
        }
    }

    /// Derives the address for this keypair's public key.
    pub fn address(&self) -> Address {
        address_from_public_key(&self.public_key)
    }

    /// Signs `message` with this keypair's secret key.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        sign(&self.secret_key, message)
    }
}

/// Derives an [`Address`] from a secp256k1 public key.
///
/// The derivation is a Base58Check-style pipeline:
/// 1. SHA-256 the compressed public key bytes.
/// 2. Truncate the digest to 20 bytes.
/// 3. Prepend a one-byte network version (`0x00` for mainnet).
/// 4. Append a 4-byte checksum: the first four bytes of the double
///    SHA-256 of the version+payload bytes.
/// 5. Base58-encode the result and prepend the fixed `GRS_` textual prefix.
pub fn address_from_public_key(public_key: &PublicKey) -> Address {
    const VERSION: u8 = 0x00;

    let pk_bytes = public_key.serialize(); // 33-byte compressed form
    let digest = Hash256::compute(&pk_bytes);
    let truncated = &digest.as_bytes()[..20];

    let mut payload = Vec::with_capacity(1 + 20);
    payload.push(VERSION);
    payload.extend_from_slice(truncated);

    let checksum = Hash256::compute_double(&payload);
    payload.extend_from_slice(&checksum.as_bytes()[..4]);

    let encoded = bs58::encode(&payload).into_string();
    Address::from_raw(format!("{ADDRESS_PREFIX}{encoded}"))
}

/// Parses the raw version+payload+checksum bytes out of an [`Address`],
/// verifying the checksum. Returns `None` for reserved sentinel addresses
/// (`system`, `staking_pool`, `genesis`) or malformed text.
pub fn decode_address_payload(address: &Address) -> Option<(u8, [u8; 20])> {
    let text = address.as_str().strip_prefix(ADDRESS_PREFIX)?;
    let raw = bs58::decode(text).into_vec().ok()?;
    if raw.len() != 1 + 20 + 4 {
        return None;
    }
    let (body, checksum) = raw.split_at(1 + 20);
    let expected = Hash256::compute_double(body);
    if &expected.as_bytes()[..4] != checksum {
        return None;
    }
    let version = body[0];
    let mut hash20 = [0u8; 20];
    hash20.copy_from_slice(&body[1..]);
    Some((version, hash20))
}

/// Serializes `value` into the canonical JSON-subset byte form used for
/// hashing and signing: lexicographically sorted ASCII keys, no
/// insignificant whitespace, integers as bare JSON numbers.
///
/// Going through `serde_json::Value` first (rather than calling
/// `serde_json::to_vec` directly on `value`) matters: a derived
/// `Serialize` impl for a struct emits its fields in declaration order, not
/// sorted order. `serde_json`'s default `Map` representation (this crate
/// does not enable the `preserve_order` feature) is `BTreeMap`-backed, so
/// converting to a `Value` first — which re-serializes every nested object
/// through that map — is what actually sorts keys, recursively, before the
/// final `to_vec`.
pub fn canonical_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Signs a message with recoverable ECDSA over secp256k1, returning a
/// 65-byte signature (64-byte compact form plus a one-byte recovery id).
/// `message` is reduced to a 32-byte digest via SHA-256 before signing.
pub fn sign(secret_key: &SecretKey, message: &[u8]) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let digest = Hash256::compute(message);
    let msg = Message::from_digest(*digest.as_bytes());
    let sig = secp.sign_ecdsa_recoverable(&msg, secret_key);
    let (recid, bytes) = sig.serialize_compact();
    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&bytes);
    out.push(i32::from(recid) as u8);
    out
}

/// Recovers the address that produced `signature_bytes` over `message`, or
/// `None` if the signature is malformed or does not recover cleanly.
pub fn recover_address(message: &[u8], signature_bytes: &[u8]) -> Option<Address> {
    if signature_bytes.len() != 65 {
        return None;
    }
    let (compact, recid_byte) = signature_bytes.split_at(64);
    let recid = RecoveryId::try_from(recid_byte[0] as i32).ok()?;
    let sig = RecoverableSignature::from_compact(compact, recid).ok()?;

    let secp = Secp256k1::verification_only();
    let digest = Hash256::compute(message);
    let msg = Message::from_digest(*digest.as_bytes());
    let public_key = secp.recover_ecdsa(&msg, &sig).ok()?;
    Some(address_from_public_key(&public_key))
}

/// Verifies that `signature_bytes` over `message` recovers to `expected`.
///
/// Returns `Ok(false)` (never an `Err`) on a mismatch or a signature that
/// fails to recover; malformed signature *encoding* (wrong length, bad
/// recovery id) is the only error condition.
pub fn verify(message: &[u8], signature_bytes: &[u8], expected: &Address) -> Result<bool, CryptoError> {
    if signature_bytes.len() != 65 {
        return Err(CryptoError::BadSignature);
    }
    Ok(recover_address(message, signature_bytes).as_ref() == Some(expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_derivation_is_deterministic() {
        let kp = Keypair::generate();
        let a1 = kp.address();
        let a2 = address_from_public_key(&kp.public_key);
        assert_eq!(a1, a2);
        assert!(a1.as_str().starts_with(ADDRESS_PREFIX));
    }

    #[test]
    fn address_checksum_roundtrips() {
        let kp = Keypair::generate();
        let addr = kp.address();
        let (version, _hash20) = decode_address_payload(&addr).expect("valid address");
        assert_eq!(version, 0x00);
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = Keypair::generate();
        let msg = b"transfer 100 units";
        let sig = kp.sign(msg);
        let ok = verify(msg, &sig, &kp.address()).expect("verify should not error");
        assert!(ok);
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"original message");
        let ok = verify(b"tampered message", &sig, &kp.address()).expect("verify should not error");
        assert!(!ok);
    }

    #[test]
    fn verify_rejects_wrong_address() {
        let kp = Keypair::generate();
        let other = Keypair::generate();
        let sig = kp.sign(b"hello");
        let ok = verify(b"hello", &sig, &other.address()).expect("verify should not error");
        assert!(!ok);
    }

    #[test]
    fn canonical_serialize_sorts_keys() {
        #[derive(Serialize)]
        struct Unsorted {
            zeta: u64,
            alpha: u64,
        }
        let bytes = canonical_serialize(&Unsorted { zeta: 1, alpha: 2 }).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"alpha":2,"zeta":1}"#);
    }
}
