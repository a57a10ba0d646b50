//! Token ledger: balances, stakes, total supply, and per-address history,
//! obtained by folding transactions over an initially-empty state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Address, Hash256, Transaction, TxType};

/// Minimum units that must remain staked for a STAKE to be accepted.
pub const MIN_STAKE: u64 = 100 * 100_000_000;

/// Seconds a stake must remain locked before it can be unstaked.
pub const STAKE_LOCK_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Hard cap on total supply, in minimal units.
pub const MAX_SUPPLY: u64 = 1_000_000_000 * 100_000_000;

/// Base block reward before any halving, in minimal units.
pub const BASE_BLOCK_REWARD: u64 = 50 * 100_000_000;

/// Number of blocks between successive reward halvings.
pub const HALVING_INTERVAL: u64 = 210_000;

/// Number of halvings after which the reward is defined to be zero.
pub const MAX_HALVINGS: u64 = 64;

/// Units credited to the configured founder address by the genesis GENESIS
/// transaction on a fresh bootstrap: 10^8 whole tokens at 10^8 units each.
pub const GENESIS_FOUNDER_SUPPLY: u64 = 100_000_000 * 100_000_000;

/// Errors raised while applying a transaction to the ledger.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum LedgerError {
    #[error("sender has insufficient balance for this transaction")]
    InsufficientBalance,
    #[error("sender has insufficient stake for this transaction")]
    InsufficientStake,
    #[error("stake amount {0} is below the minimum stake {MIN_STAKE}")]
    StakeTooSmall(u64),
    #[error("stake is locked until {unlocks_at}, current block timestamp is {now}")]
    StakeLocked { now: u64, unlocks_at: u64 },
    #[error("applying this transaction would exceed the maximum supply")]
    SupplyCapExceeded,
    #[error("transaction type is not valid in this context")]
    InvalidType,
}

/// A single address's staking position.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stake {
    pub amount: u64,
    pub staked_at: u64,
}

/// Derived ledger state: balances, stakes, total supply, and a per-address
/// transaction index, obtained by folding transactions in chain order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokenLedger {
    balances: HashMap<Address, u64>,
    stakes: HashMap<Address, Stake>,
    total_supply: u64,
    history: HashMap<Address, Vec<Hash256>>,
}

impl TokenLedger {
    /// Builds a fresh, empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, addr: &Address) -> u64 {
        self.balances.get(addr).copied().unwrap_or(0)
    }

    pub fn staked(&self, addr: &Address) -> u64 {
        self.stakes.get(addr).map(|s| s.amount).unwrap_or(0)
    }

    pub fn stake_info(&self, addr: &Address) -> Option<Stake> {
        self.stakes.get(addr).copied()
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// All addresses currently holding a non-zero stake, with their amounts.
    pub fn stakes(&self) -> impl Iterator<Item = (&Address, &Stake)> {
        self.stakes.iter()
    }

    /// Ordered list of `tx_id`s this address has appeared in.
    pub fn history(&self, addr: &Address) -> &[Hash256] {
        self.history.get(addr).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Computes the scheduled reward for the block at `height`, applying the
    /// halving schedule and clamping so `total_supply` never exceeds
    /// [`MAX_SUPPLY`].
    pub fn block_reward(&self, height: u64) -> u64 {
        let halvings = height / HALVING_INTERVAL;
        if halvings >= MAX_HALVINGS {
            return 0;
        }
        let raw = BASE_BLOCK_REWARD
            .checked_shr(halvings as u32)
            .unwrap_or(0);
        let remainder = MAX_SUPPLY.saturating_sub(self.total_supply);
        raw.min(remainder)
    }

    /// Applies one transaction to the ledger. Atomic: on error, no field of
    /// the ledger is mutated.
    ///
    /// `block_timestamp` is the enclosing block's timestamp, used (not wall
    /// clock) to evaluate the STAKE lock window deterministically across
    /// replicas.
    pub fn apply(&mut self, tx: &Transaction, block_timestamp: u64) -> Result<(), LedgerError> {
        self.check(tx, block_timestamp)?;

        match tx.tx_type {
            TxType::Genesis | TxType::Reward => {
                self.credit_balance(&tx.recipient, tx.amount);
                self.total_supply += tx.amount;
            }
            TxType::Transfer => {
                self.debit_balance(&tx.sender, tx.amount + tx.fee);
                self.credit_balance(&tx.recipient, tx.amount);
            }
            TxType::Stake => {
                self.debit_balance(&tx.sender, tx.amount + tx.fee);
                let entry = self.stakes.entry(tx.sender.clone()).or_insert(Stake {
                    amount: 0,
                    staked_at: block_timestamp,
                });
                entry.amount += tx.amount;
                entry.staked_at = block_timestamp;
            }
            TxType::Unstake => {
                self.debit_balance(&tx.sender, tx.fee);
                self.credit_balance(&tx.sender, tx.amount);
                if let Some(entry) = self.stakes.get_mut(&tx.sender) {
                    entry.amount -= tx.amount;
                    if entry.amount == 0 {
                        self.stakes.remove(&tx.sender);
                    }
                }
            }
            TxType::Fee => {
                self.credit_balance(&tx.recipient, tx.amount);
            }
        }

        self.index_tx(tx);
        Ok(())
    }

    /// Validates `tx` against the current state without mutating anything.
    fn check(&self, tx: &Transaction, block_timestamp: u64) -> Result<(), LedgerError> {
        match tx.tx_type {
            TxType::Genesis | TxType::Reward => {
                if self.total_supply.saturating_add(tx.amount) > MAX_SUPPLY {
                    return Err(LedgerError::SupplyCapExceeded);
                }
            }
            TxType::Transfer => {
                let need = tx.amount.saturating_add(tx.fee);
                if self.balance(&tx.sender) < need {
                    return Err(LedgerError::InsufficientBalance);
                }
            }
            TxType::Stake => {
                let need = tx.amount.saturating_add(tx.fee);
                if self.balance(&tx.sender) < need {
                    return Err(LedgerError::InsufficientBalance);
                }
                let resulting = self.staked(&tx.sender) + tx.amount;
                if resulting < MIN_STAKE {
                    return Err(LedgerError::StakeTooSmall(resulting));
                }
            }
            TxType::Unstake => {
                if self.balance(&tx.sender) < tx.fee {
                    return Err(LedgerError::InsufficientBalance);
                }
                let stake = self
                    .stakes
                    .get(&tx.sender)
                    .ok_or(LedgerError::InsufficientStake)?;
                if stake.amount < tx.amount {
                    return Err(LedgerError::InsufficientStake);
                }
                let unlocks_at = stake.staked_at + STAKE_LOCK_SECONDS;
                if block_timestamp < unlocks_at {
                    return Err(LedgerError::StakeLocked {
                        now: block_timestamp,
                        unlocks_at,
                    });
                }
            }
            TxType::Fee => {
                if self.total_supply.saturating_add(tx.amount) > MAX_SUPPLY {
                    return Err(LedgerError::SupplyCapExceeded);
                }
            }
        }
        Ok(())
    }

    fn credit_balance(&mut self, addr: &Address, amount: u64) {
        *self.balances.entry(addr.clone()).or_insert(0) += amount;
    }

    fn debit_balance(&mut self, addr: &Address, amount: u64) {
        let entry = self.balances.entry(addr.clone()).or_insert(0);
        *entry -= amount;
    }

    fn index_tx(&mut self, tx: &Transaction) {
        if !tx.sender.is_system() {
            self.history.entry(tx.sender.clone()).or_default().push(tx.tx_id);
        }
        self.history.entry(tx.recipient.clone()).or_default().push(tx.tx_id);
    }

    /// Asserts the supply invariant `total_supply == Σ balances + Σ stakes`.
    /// Exposed for tests and storage crash-recovery self-checks.
    pub fn supply_is_consistent(&self) -> bool {
        let balances_sum: u128 = self.balances.values().map(|&v| v as u128).sum();
        let stakes_sum: u128 = self.stakes.values().map(|s| s.amount as u128).sum();
        balances_sum + stakes_sum == self.total_supply as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from_raw(s)
    }

    fn tx(
        tx_type: TxType,
        sender: &str,
        recipient: &str,
        amount: u64,
        fee: u64,
        timestamp: u64,
    ) -> Transaction {
        Transaction::new(tx_type, addr(sender), addr(recipient), amount, fee, timestamp, None)
            .unwrap()
    }

    #[test]
    fn genesis_credits_balance_and_supply() {
        let mut ledger = TokenLedger::new();
        let genesis = tx(TxType::Genesis, "system", "GRS_founder", 10_000_000_000_000_000, 0, 1);
        ledger.apply(&genesis, 1).unwrap();

        assert_eq!(ledger.balance(&addr("GRS_founder")), 10_000_000_000_000_000);
        assert_eq!(ledger.total_supply(), 10_000_000_000_000_000);
        assert!(ledger.supply_is_consistent());
    }

    #[test]
    fn stake_moves_balance_into_stake_not_duplicated() {
        let mut ledger = TokenLedger::new();
        let genesis = tx(TxType::Genesis, "system", "GRS_founder", 10_000_000_000_000_000, 0, 1);
        ledger.apply(&genesis, 1).unwrap();

        let stake = tx(TxType::Stake, "GRS_founder", "staking_pool", 1_000 * 100_000_000, 0, 100);
        ledger.apply(&stake, 100).unwrap();

        assert_eq!(ledger.staked(&addr("GRS_founder")), 1_000 * 100_000_000);
        assert_eq!(
            ledger.balance(&addr("GRS_founder")),
            10_000_000_000_000_000 - 1_000 * 100_000_000
        );
        assert!(ledger.supply_is_consistent());
    }

    #[test]
    fn stake_below_minimum_is_rejected() {
        let mut ledger = TokenLedger::new();
        let genesis = tx(TxType::Genesis, "system", "GRS_founder", 10_000_000_000_000_000, 0, 1);
        ledger.apply(&genesis, 1).unwrap();

        let stake = tx(TxType::Stake, "GRS_founder", "staking_pool", MIN_STAKE - 1, 0, 100);
        let err = ledger.apply(&stake, 100).unwrap_err();
        assert_eq!(err, LedgerError::StakeTooSmall(MIN_STAKE - 1));
    }

    #[test]
    fn unstake_before_lock_expires_is_rejected() {
        let mut ledger = TokenLedger::new();
        ledger
            .apply(&tx(TxType::Genesis, "system", "GRS_b", 10_000_000_000_000_000, 0, 1), 1)
            .unwrap();
        ledger
            .apply(&tx(TxType::Stake, "GRS_b", "staking_pool", MIN_STAKE, 0, 1_000), 1_000)
            .unwrap();

        let too_early = 1_000 + 6 * 86_400;
        let err = ledger
            .apply(&tx(TxType::Unstake, "GRS_b", "GRS_b", MIN_STAKE, 0, too_early), too_early)
            .unwrap_err();
        assert!(matches!(err, LedgerError::StakeLocked { .. }));

        let unlocked = 1_000 + 7 * 86_400 + 1;
        ledger
            .apply(&tx(TxType::Unstake, "GRS_b", "GRS_b", MIN_STAKE, 0, unlocked), unlocked)
            .unwrap();
        assert_eq!(ledger.staked(&addr("GRS_b")), 0);
        assert_eq!(ledger.balance(&addr("GRS_b")), 10_000_000_000_000_000);
    }

    #[test]
    fn insufficient_balance_leaves_ledger_unchanged() {
        let mut ledger = TokenLedger::new();
        ledger
            .apply(&tx(TxType::Genesis, "system", "GRS_a", 100, 0, 1), 1)
            .unwrap();

        let before = ledger.clone();
        let err = ledger
            .apply(&tx(TxType::Transfer, "GRS_a", "GRS_b", 1_000, 0, 2), 2)
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientBalance);
        assert_eq!(ledger.balance(&addr("GRS_a")), before.balance(&addr("GRS_a")));
        assert_eq!(ledger.total_supply(), before.total_supply());
    }

    #[test]
    fn block_reward_halves_and_clamps_to_zero_after_64_halvings() {
        let ledger = TokenLedger::new();
        assert_eq!(ledger.block_reward(0), BASE_BLOCK_REWARD);
        assert_eq!(ledger.block_reward(HALVING_INTERVAL), BASE_BLOCK_REWARD / 2);
        assert_eq!(ledger.block_reward(MAX_HALVINGS * HALVING_INTERVAL + 1), 0);
    }

    #[test]
    fn block_reward_clamps_at_max_supply() {
        let mut ledger = TokenLedger::new();
        ledger
            .apply(
                &tx(TxType::Genesis, "system", "GRS_a", MAX_SUPPLY - 10, 0, 1),
                1,
            )
            .unwrap();
        assert_eq!(ledger.block_reward(0), 10);
    }
}
