//! Block type and canonical hashing.
//!
//! Serialization for hashing goes through the same canonical JSON-subset
//! encoding used for transactions (`crate::crypto::canonical_serialize`),
//! not a binary format, per the wire-format contract in the top-level spec.

use serde::{Deserialize, Serialize};

use super::{Address, Hash256, Transaction, TxType};
use crate::crypto::{self, CryptoError};

/// A block: an ordered batch of transactions linked to its predecessor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub previous_hash: Hash256,
    pub timestamp: u64,
    pub transactions: Vec<Transaction>,
    pub validator: Address,
    pub hash: Hash256,
}

/// The subset of a block's fields covered by its hash: everything except
/// `hash` itself.
#[derive(Serialize)]
struct HashPayload<'a> {
    index: u64,
    previous_hash: &'a Hash256,
    timestamp: u64,
    transactions: &'a [Transaction],
    validator: &'a Address,
}

impl Block {
    /// Builds the genesis block (index 0) with a single GENESIS transaction
    /// crediting `founder` with `founder_supply` units.
    pub fn genesis(founder: Address, founder_supply: u64, timestamp: u64) -> Result<Self, CryptoError> {
        let genesis_tx = Transaction::new(
            TxType::Genesis,
            Address::system(),
            founder,
            founder_supply,
            0,
            timestamp,
            None,
        )?;
        Self::new(0, Hash256::ZERO, timestamp, vec![genesis_tx], Address::genesis_validator())
    }

    /// Builds and hashes a block from its logical fields.
    pub fn new(
        index: u64,
        previous_hash: Hash256,
        timestamp: u64,
        transactions: Vec<Transaction>,
        validator: Address,
    ) -> Result<Self, CryptoError> {
        let hash = Self::hash_fields(index, &previous_hash, timestamp, &transactions, &validator)?;
        Ok(Block {
            index,
            previous_hash,
            timestamp,
            transactions,
            validator,
            hash,
        })
    }

    fn hash_fields(
        index: u64,
        previous_hash: &Hash256,
        timestamp: u64,
        transactions: &[Transaction],
        validator: &Address,
    ) -> Result<Hash256, CryptoError> {
        let payload = HashPayload {
            index,
            previous_hash,
            timestamp,
            transactions,
            validator,
        };
        let bytes = crypto::canonical_serialize(&payload)?;
        Ok(Hash256::compute(&bytes))
    }

    /// Recomputes this block's hash from its current fields.
    pub fn compute_hash(&self) -> Result<Hash256, CryptoError> {
        Self::hash_fields(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            &self.validator,
        )
    }

    /// Returns `true` if the carried `hash` matches the recomputed one.
    pub fn has_valid_hash(&self) -> bool {
        matches!(self.compute_hash(), Ok(h) if h.as_bytes() == self.hash.as_bytes())
    }

    /// Returns `true` if this is the genesis block.
    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }

    /// Returns the single REWARD transaction in this block, if present.
    pub fn reward_tx(&self) -> Option<&Transaction> {
        self.transactions
            .iter()
            .find(|tx| tx.tx_type == TxType::Reward)
    }

    /// Counts REWARD transactions; used to enforce the "at most one" rule.
    pub fn reward_tx_count(&self) -> usize {
        self.transactions
            .iter()
            .filter(|tx| tx.tx_type == TxType::Reward)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_is_deterministic() {
        let block = Block::genesis(Address::from_raw("GRS_founder"), 1_000_000, 1_700_000_000)
            .expect("genesis builds");
        let h1 = block.compute_hash().unwrap();
        let h2 = block.compute_hash().unwrap();
        assert_eq!(h1.as_bytes(), h2.as_bytes());
        assert!(block.has_valid_hash());
    }

    #[test]
    fn genesis_block_has_sentinel_fields() {
        let block = Block::genesis(Address::from_raw("GRS_founder"), 1_000_000, 1_700_000_000)
            .expect("genesis builds");
        assert_eq!(block.index, 0);
        assert_eq!(block.previous_hash.as_bytes(), Hash256::ZERO.as_bytes());
        assert_eq!(block.validator.as_str(), "genesis");
        assert!(block.is_genesis());
    }

    #[test]
    fn tampering_invalidates_hash() {
        let mut block = Block::genesis(Address::from_raw("GRS_founder"), 1_000_000, 1_700_000_000)
            .expect("genesis builds");
        block.timestamp += 1;
        assert!(!block.has_valid_hash());
    }

    #[test]
    fn at_most_one_reward_tx_is_countable() {
        let block = Block::genesis(Address::from_raw("GRS_founder"), 1_000_000, 1_700_000_000)
            .expect("genesis builds");
        assert_eq!(block.reward_tx_count(), 0);
        assert!(block.reward_tx().is_none());
    }
}
