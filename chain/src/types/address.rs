//! Textual account addresses.
//!
//! An [`Address`] is an opaque, base58-encoded identifier derived from a
//! public key (see [`crate::crypto::address_from_public_key`]). Equality is
//! textual, matching the wire representation exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed textual prefix carried by every derived address.
pub const ADDRESS_PREFIX: &str = "GRS_";

/// Reserved address that mints system transactions (GENESIS, REWARD, FEE).
/// Has no keypair; never appears as a transaction signer.
pub const SYSTEM_ADDRESS: &str = "system";

/// Reserved address that receives staked funds. Never spends directly.
pub const STAKING_POOL_ADDRESS: &str = "staking_pool";

/// Sentinel proposer value carried by the genesis block.
pub const GENESIS_VALIDATOR: &str = "genesis";

/// An account address, exchanged as text.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Wraps an already-formatted address string without validation.
    ///
    /// Used for the reserved sentinel addresses and for addresses read back
    /// from storage, where the bytes have already been validated once.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Address(s.into())
    }

    /// The reserved `system` address.
    pub fn system() -> Self {
        Address(SYSTEM_ADDRESS.to_string())
    }

    /// The reserved `staking_pool` address.
    pub fn staking_pool() -> Self {
        Address(STAKING_POOL_ADDRESS.to_string())
    }

    /// The genesis block's sentinel proposer value.
    pub fn genesis_validator() -> Self {
        Address(GENESIS_VALIDATOR.to_string())
    }

    /// Returns `true` if this is the reserved `system` address.
    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_ADDRESS
    }

    /// Returns the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Address(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Address(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_address_is_stable() {
        assert_eq!(Address::system().as_str(), "system");
        assert!(Address::system().is_system());
    }

    #[test]
    fn equality_is_textual() {
        let a = Address::from_raw("GRS_abc123");
        let b = Address::from("GRS_abc123");
        assert_eq!(a, b);
    }
}
