//! The chain: an ordered, append-only sequence of blocks alongside the
//! ledger derived by replaying them, plus the fork-choice rule used to pick
//! between competing candidate chains.

use std::collections::HashSet;

use thiserror::Error;

use crate::consensus::{self, ConsensusConfig, ConsensusError};
use crate::ledger::{LedgerError, TokenLedger};
use crate::types::{Address, Block, Hash256, TxType};

/// Errors that can cause a candidate block (or candidate chain) to be
/// rejected. On any of these, the chain and ledger are left byte-identical
/// to their pre-call state.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("candidate index {candidate} does not follow tip index {tip}")]
    BadIndex { candidate: u64, tip: u64 },
    #[error("candidate previous_hash does not match tip hash")]
    BadPreviousHash,
    #[error("candidate timestamp {candidate} is not after tip timestamp {tip}")]
    TimestampNotIncreasing { candidate: u64, tip: u64 },
    #[error("candidate timestamp {candidate} exceeds now+skew {limit}")]
    TimestampTooFarAhead { candidate: u64, limit: u64 },
    #[error("candidate hash does not match its recomputed fields")]
    BadHash,
    #[error("proposer election failed: {0}")]
    Election(#[from] ConsensusError),
    #[error("candidate.validator {got} is not the expected proposer {expected}")]
    WrongProposer { got: Address, expected: Address },
    #[error("transaction {0} carries an id that doesn't match its content")]
    BadTxId(Hash256),
    #[error("transaction {0} was already included in an earlier block")]
    DuplicateTxId(Hash256),
    #[error("transaction {0} has an invalid signature")]
    BadSignature(Hash256),
    #[error("transaction {0} has sender=system without a system transaction type, or vice versa")]
    SenderTypeMismatch(Hash256),
    #[error("transaction {0} requires amount > 0 for its type")]
    NonPositiveAmount(Hash256),
    #[error("transaction {0} carries a type only admissible in the genesis block")]
    DisallowedInBlock(Hash256),
    #[error("transaction {tx_id} rejected by the ledger: {source}")]
    LedgerRejected { tx_id: Hash256, source: LedgerError },
    #[error("block carries more than one REWARD transaction")]
    MultipleRewardTxs,
    #[error("REWARD recipient {got} does not match the block's validator {expected}")]
    BadRewardRecipient { got: Address, expected: Address },
    #[error("REWARD amount {got} does not match the scheduled amount {expected}")]
    BadRewardAmount { got: u64, expected: u64 },
    #[error("candidate chain does not start from the same genesis block")]
    GenesisMismatch,
    #[error("candidate chain is not strictly longer than the current chain")]
    NotLonger,
    #[error("cannot validate an empty candidate chain")]
    EmptyChain,
}

/// Owns the canonical sequence of blocks and the ledger derived from them.
pub struct Chain {
    blocks: Vec<Block>,
    ledger: TokenLedger,
    seen_tx_ids: HashSet<Hash256>,
    consensus_cfg: ConsensusConfig,
}

impl Chain {
    /// Starts a new chain from a genesis block. The genesis block is taken
    /// on faith (it carries the sentinel proposer and previous-hash values
    /// and is never subject to `append`'s validation algorithm); only its
    /// single GENESIS transaction is applied to the ledger.
    pub fn new(genesis: Block, consensus_cfg: ConsensusConfig) -> Result<Self, ValidationError> {
        if !genesis.is_genesis() || !genesis.has_valid_hash() {
            return Err(ValidationError::BadHash);
        }
        let mut ledger = TokenLedger::new();
        let mut seen_tx_ids = HashSet::new();
        for tx in &genesis.transactions {
            ledger
                .apply(tx, genesis.timestamp)
                .map_err(|source| ValidationError::LedgerRejected { tx_id: tx.tx_id, source })?;
            seen_tx_ids.insert(tx.tx_id);
        }
        Ok(Chain {
            blocks: vec![genesis],
            ledger,
            seen_tx_ids,
            consensus_cfg,
        })
    }

    /// Reconstructs a chain by replaying already-persisted blocks in index
    /// order, without re-running proposer-election or timestamp validation.
    ///
    /// Used by storage on load: blocks read back from disk were validated
    /// once via `append` before being persisted, so re-deriving the ledger
    /// by straight replay (rather than full re-validation) is sufficient and
    /// much cheaper. `blocks` must be non-empty and start with a genesis
    /// block.
    pub fn from_blocks(blocks: Vec<Block>, consensus_cfg: ConsensusConfig) -> Result<Self, ValidationError> {
        let (genesis, rest) = blocks.split_first().ok_or(ValidationError::EmptyChain)?;
        let mut chain = Self::new(genesis.clone(), consensus_cfg)?;
        for block in rest {
            for tx in &block.transactions {
                chain
                    .ledger
                    .apply(tx, block.timestamp)
                    .map_err(|source| ValidationError::LedgerRejected { tx_id: tx.tx_id, source })?;
                chain.seen_tx_ids.insert(tx.tx_id);
            }
            chain.blocks.push(block.clone());
        }
        Ok(chain)
    }

    pub fn tip(&self) -> &Block {
        self.blocks.last().expect("chain always has a genesis block")
    }

    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn block_at(&self, index: u64) -> Option<&Block> {
        self.blocks.get(index as usize)
    }

    pub fn block_by_hash(&self, hash: &Hash256) -> Option<&Block> {
        self.blocks.iter().find(|b| b.hash == *hash)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn ledger(&self) -> &TokenLedger {
        &self.ledger
    }

    pub fn balance(&self, addr: &Address) -> u64 {
        self.ledger.balance(addr)
    }

    pub fn staked(&self, addr: &Address) -> u64 {
        self.ledger.staked(addr)
    }

    pub fn history(&self, addr: &Address) -> &[Hash256] {
        self.ledger.history(addr)
    }

    /// The proposer expected for the *next* block, given the current tip.
    pub fn expected_next_proposer(&self) -> Result<Address, ConsensusError> {
        consensus::expected_proposer(&self.ledger, &self.consensus_cfg, &self.tip().hash)
    }

    /// Validates `candidate` against the current tip and, if valid, applies
    /// its transactions to the ledger and appends it. Atomic: on any error
    /// the chain and ledger are unchanged.
    pub fn append(&mut self, candidate: Block, now: u64) -> Result<(), ValidationError> {
        let previous = self.tip();
        let scratch = Self::validate_successor(
            &candidate,
            previous,
            &self.ledger,
            &self.seen_tx_ids,
            &self.consensus_cfg,
            now,
        )?;

        for tx in &candidate.transactions {
            self.seen_tx_ids.insert(tx.tx_id);
        }
        self.ledger = scratch;
        self.blocks.push(candidate);
        Ok(())
    }

    /// Runs the block validation algorithm (steps 1-7) without mutating
    /// anything; returns the ledger that results from applying every
    /// transaction in `candidate`, for the caller to commit.
    fn validate_successor(
        candidate: &Block,
        previous: &Block,
        ledger: &TokenLedger,
        seen_tx_ids: &HashSet<Hash256>,
        cfg: &ConsensusConfig,
        now: u64,
    ) -> Result<TokenLedger, ValidationError> {
        // 1. index
        if candidate.index != previous.index + 1 {
            return Err(ValidationError::BadIndex {
                candidate: candidate.index,
                tip: previous.index,
            });
        }
        // 2. previous_hash
        if candidate.previous_hash != previous.hash {
            return Err(ValidationError::BadPreviousHash);
        }
        // 3. timestamp
        if candidate.timestamp <= previous.timestamp {
            return Err(ValidationError::TimestampNotIncreasing {
                candidate: candidate.timestamp,
                tip: previous.timestamp,
            });
        }
        let skew_limit = now + cfg.max_clock_skew;
        if candidate.timestamp > skew_limit {
            return Err(ValidationError::TimestampTooFarAhead {
                candidate: candidate.timestamp,
                limit: skew_limit,
            });
        }
        // 4. hash
        if !candidate.has_valid_hash() {
            return Err(ValidationError::BadHash);
        }
        // 5. proposer
        let expected = consensus::expected_proposer(ledger, cfg, &previous.hash)?;
        if candidate.validator != expected {
            return Err(ValidationError::WrongProposer {
                got: candidate.validator.clone(),
                expected,
            });
        }
        // 6. per-transaction checks
        let mut scratch = ledger.clone();
        for tx in &candidate.transactions {
            if !tx.has_valid_id() {
                return Err(ValidationError::BadTxId(tx.tx_id));
            }
            if seen_tx_ids.contains(&tx.tx_id) {
                return Err(ValidationError::DuplicateTxId(tx.tx_id));
            }
            // A non-genesis block only ever admits REWARD as a system
            // transaction; GENESIS mints supply out of thin air and FEE
            // credits balance with no backing debit, so both are confined
            // to the genesis block (applied directly by `Chain::new`,
            // never through this path).
            if matches!(tx.tx_type, TxType::Genesis | TxType::Fee) {
                return Err(ValidationError::DisallowedInBlock(tx.tx_id));
            }
            if tx.sender.is_system() != tx.is_system_tx() {
                return Err(ValidationError::SenderTypeMismatch(tx.tx_id));
            }
            if tx.tx_type != TxType::Fee && tx.amount == 0 {
                return Err(ValidationError::NonPositiveAmount(tx.tx_id));
            }
            if !tx.is_system_tx() {
                let ok = tx
                    .verify_signature()
                    .map_err(|_| ValidationError::BadSignature(tx.tx_id))?;
                if !ok {
                    return Err(ValidationError::BadSignature(tx.tx_id));
                }
            }
            scratch
                .apply(tx, candidate.timestamp)
                .map_err(|source| ValidationError::LedgerRejected { tx_id: tx.tx_id, source })?;
        }
        // 7. reward
        let reward_count = candidate.reward_tx_count();
        if reward_count > 1 {
            return Err(ValidationError::MultipleRewardTxs);
        }
        if let Some(reward) = candidate.reward_tx() {
            if reward.recipient != candidate.validator {
                return Err(ValidationError::BadRewardRecipient {
                    got: reward.recipient.clone(),
                    expected: candidate.validator.clone(),
                });
            }
            let expected_amount = ledger.block_reward(candidate.index);
            if reward.amount != expected_amount {
                return Err(ValidationError::BadRewardAmount {
                    got: reward.amount,
                    expected: expected_amount,
                });
            }
        }

        Ok(scratch)
    }

    /// Fully re-validates `candidate_chain` from block 1 onward against a
    /// freshly rebuilt ledger and, if it is valid, strictly longer, and
    /// shares this chain's genesis block, replaces the local chain wholesale.
    pub fn replace(&mut self, candidate_chain: Vec<Block>, now: u64) -> Result<(), ValidationError> {
        let (genesis, rest) = candidate_chain.split_first().ok_or(ValidationError::EmptyChain)?;
        if genesis.hash != self.blocks[0].hash {
            return Err(ValidationError::GenesisMismatch);
        }
        if candidate_chain.len() <= self.blocks.len() {
            return Err(ValidationError::NotLonger);
        }

        let mut ledger = TokenLedger::new();
        let mut seen = HashSet::new();
        for tx in &genesis.transactions {
            ledger
                .apply(tx, genesis.timestamp)
                .map_err(|source| ValidationError::LedgerRejected { tx_id: tx.tx_id, source })?;
            seen.insert(tx.tx_id);
        }

        let mut previous = genesis;
        for candidate in rest {
            ledger = Self::validate_successor(candidate, previous, &ledger, &seen, &self.consensus_cfg, now)?;
            for tx in &candidate.transactions {
                seen.insert(tx.tx_id);
            }
            previous = candidate;
        }

        self.blocks = candidate_chain;
        self.ledger = ledger;
        self.seen_tx_ids = seen;
        Ok(())
    }

    /// Cumulative stake of the chain's *unique* proposers, used as the
    /// fork-choice tie-breaker ahead of raw tip-hash comparison.
    pub fn cumulative_proposer_stake(&self) -> u128 {
        let unique: HashSet<&Address> = self.blocks.iter().map(|b| &b.validator).collect();
        unique.into_iter().map(|addr| self.ledger.staked(addr) as u128).sum()
    }
}

/// Decides whether `candidate` should replace `current` as the canonical
/// chain: longest valid chain wins; ties are broken by higher cumulative
/// stake of unique proposers, then by lower numeric tip-hash value.
pub fn is_better_chain(current: &Chain, candidate: &Chain) -> bool {
    if candidate.len() != current.len() {
        return candidate.len() > current.len();
    }
    let current_stake = current.cumulative_proposer_stake();
    let candidate_stake = candidate.cumulative_proposer_stake();
    if candidate_stake != current_stake {
        return candidate_stake > current_stake;
    }
    // Lexicographic byte comparison is equivalent to numeric comparison for
    // fixed-width big-endian values, so no bignum conversion is needed here.
    candidate.tip().hash.as_bytes() < current.tip().hash.as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::ledger::MIN_STAKE;
    use crate::types::{Block, Transaction};

    fn genesis_chain(founder: &Keypair, supply: u64) -> Chain {
        let genesis = Block::genesis(founder.address(), supply, 1_700_000_000).unwrap();
        Chain::new(genesis, ConsensusConfig::default()).unwrap()
    }

    fn stake_block(chain: &Chain, founder: &Keypair, amount: u64, ts: u64) -> Block {
        let previous = chain.tip();
        let tx = Transaction::new(
            TxType::Stake,
            founder.address(),
            Address::staking_pool(),
            amount,
            0,
            ts,
            Some(&founder.secret_key),
        )
        .unwrap();
        Block::new(previous.index + 1, previous.hash, ts, vec![tx], Address::genesis_validator()).unwrap()
    }

    #[test]
    fn genesis_chain_has_height_zero() {
        let founder = Keypair::generate();
        let chain = genesis_chain(&founder, 1_000_000 * 100_000_000);
        assert_eq!(chain.height(), 0);
        assert_eq!(chain.balance(&founder.address()), 1_000_000 * 100_000_000);
    }

    #[test]
    fn append_rejects_wrong_proposer() {
        let founder = Keypair::generate();
        let mut chain = genesis_chain(&founder, 1_000_000 * 100_000_000);

        // No validators staked yet, so the expected proposer for block 1 is
        // undefined (election fails) and this append must fail.
        let block = stake_block(&chain, &founder, MIN_STAKE, 1_700_000_100);
        let err = chain.append(block, 1_700_000_200).unwrap_err();
        assert!(matches!(err, ValidationError::Election(_)));
    }

    #[test]
    fn append_rejects_stale_timestamp() {
        let founder = Keypair::generate();
        let mut chain = genesis_chain(&founder, 1_000_000 * 100_000_000);
        let previous = chain.tip().clone();
        let tx = Transaction::new(
            TxType::Transfer,
            founder.address(),
            Address::from_raw("GRS_other"),
            10,
            0,
            previous.timestamp,
            Some(&founder.secret_key),
        )
        .unwrap();
        let block = Block::new(
            previous.index + 1,
            previous.hash,
            previous.timestamp,
            vec![tx],
            Address::genesis_validator(),
        )
        .unwrap();
        let err = chain.append(block, previous.timestamp + 10).unwrap_err();
        assert!(matches!(err, ValidationError::TimestampNotIncreasing { .. }));
    }

    #[test]
    fn replace_rejects_mismatched_genesis() {
        let founder = Keypair::generate();
        let mut chain = genesis_chain(&founder, 1_000_000 * 100_000_000);
        let other_genesis = Block::genesis(Address::from_raw("GRS_someone_else"), 1, 1_700_000_000).unwrap();
        let err = chain.replace(vec![other_genesis], 1_700_000_100).unwrap_err();
        assert!(matches!(err, ValidationError::GenesisMismatch));
    }

    #[test]
    fn replace_rejects_non_longer_chain() {
        let founder = Keypair::generate();
        let mut chain = genesis_chain(&founder, 1_000_000 * 100_000_000);
        let same = chain.blocks().to_vec();
        let err = chain.replace(same, 1_700_000_100).unwrap_err();
        assert!(matches!(err, ValidationError::NotLonger));
    }
}
