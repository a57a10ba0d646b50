//! Core domain types shared across the chain: addresses, hashes,
//! transactions, and blocks.
//!
//! The goal is to avoid "naked" byte buffers and strings in public APIs and
//! instead use domain-specific newtypes wherever the wire format or the
//! consensus rules attach meaning to a value.

mod address;
mod block;
mod hash;
mod tx;

pub use address::{ADDRESS_PREFIX, Address, GENESIS_VALIDATOR, STAKING_POOL_ADDRESS, SYSTEM_ADDRESS};
pub use block::Block;
pub use hash::{HASH_LEN, Hash256};
pub use tx::{Transaction, TxType};
