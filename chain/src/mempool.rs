//! Pending-transaction pool.
//!
//! An in-memory, fee-ordered set of not-yet-included transactions. The pool
//! tracks `pending_spend` per sender so two transactions from the same
//! sender can't both pass a balance check when their union would overdraw,
//! and enforces a capacity cap with lowest-fee-then-oldest eviction.

use std::collections::HashMap;

use thiserror::Error;

use crate::types::{Address, Hash256, Transaction, TxType};

/// Errors returned by [`Mempool::submit`].
#[derive(Debug, Error, Eq, PartialEq)]
pub enum MempoolError {
    #[error("transaction {0} carries an id that doesn't match its content")]
    BadTxId(Hash256),
    #[error("transaction {0} has an invalid signature")]
    BadSignature(Hash256),
    #[error("transaction {0} is already pending")]
    Duplicate(Hash256),
    #[error("transaction type is not submittable by clients")]
    NotSubmittable,
    #[error("sender has insufficient balance accounting for other pending transactions")]
    InsufficientBalance,
}

struct Entry {
    tx: Transaction,
    arrival: u64,
    debit: u64,
}

/// Fee-ordered pending transaction pool.
pub struct Mempool {
    entries: HashMap<Hash256, Entry>,
    pending_spend: HashMap<Address, u64>,
    cap: usize,
    next_arrival: u64,
}

impl Mempool {
    /// Creates an empty pool with the given capacity.
    pub fn new(cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            pending_spend: HashMap::new(),
            cap,
            next_arrival: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tx_id: &Hash256) -> bool {
        self.entries.contains_key(tx_id)
    }

    /// Validates and admits `tx`. `balance` is the sender's current
    /// confirmed balance (from the chain), used alongside this pool's
    /// `pending_spend` accounting to reject transactions that would overdraw
    /// once earlier-pending transactions from the same sender are honored.
    pub fn submit(&mut self, tx: Transaction, balance: u64) -> Result<(), MempoolError> {
        if !tx.has_valid_id() {
            return Err(MempoolError::BadTxId(tx.tx_id));
        }
        if tx.is_system_tx() {
            return Err(MempoolError::NotSubmittable);
        }
        if self.entries.contains_key(&tx.tx_id) {
            return Err(MempoolError::Duplicate(tx.tx_id));
        }
        let signed_ok = tx.verify_signature().map_err(|_| MempoolError::BadSignature(tx.tx_id))?;
        if !signed_ok {
            return Err(MempoolError::BadSignature(tx.tx_id));
        }

        let debit = debit_amount(&tx);
        let already_pending = self.pending_spend.get(&tx.sender).copied().unwrap_or(0);
        if already_pending.saturating_add(debit) > balance {
            return Err(MempoolError::InsufficientBalance);
        }

        let arrival = self.next_arrival;
        self.next_arrival += 1;
        *self.pending_spend.entry(tx.sender.clone()).or_insert(0) += debit;
        self.entries.insert(tx.tx_id, Entry { tx, arrival, debit });

        self.evict_if_over_cap();
        Ok(())
    }

    fn evict_if_over_cap(&mut self) {
        while self.entries.len() > self.cap {
            let worst = self
                .entries
                .values()
                .min_by(|a, b| a.tx.fee.cmp(&b.tx.fee).then(a.arrival.cmp(&b.arrival)))
                .map(|e| e.tx.tx_id);
            if let Some(tx_id) = worst {
                self.remove(&tx_id);
            } else {
                break;
            }
        }
    }

    fn remove(&mut self, tx_id: &Hash256) -> Option<Transaction> {
        let entry = self.entries.remove(tx_id)?;
        if let Some(spend) = self.pending_spend.get_mut(&entry.tx.sender) {
            *spend = spend.saturating_sub(entry.debit);
            if *spend == 0 {
                self.pending_spend.remove(&entry.tx.sender);
            }
        }
        Some(entry.tx)
    }

    /// Removes and returns up to `limit` transactions in fee-descending,
    /// then arrival-ascending order.
    pub fn drain(&mut self, limit: usize) -> Vec<Transaction> {
        let mut ids: Vec<Hash256> = self.entries.keys().copied().collect();
        ids.sort_by(|a, b| {
            let ea = &self.entries[a];
            let eb = &self.entries[b];
            eb.tx.fee.cmp(&ea.tx.fee).then(ea.arrival.cmp(&eb.arrival))
        });
        ids.truncate(limit);
        ids.iter().filter_map(|id| self.remove(id)).collect()
    }

    /// Removes transactions that appeared in a freshly appended block
    /// (whether or not this node's own `drain` produced them).
    pub fn purge(&mut self, tx_ids: &[Hash256]) {
        for tx_id in tx_ids {
            self.remove(tx_id);
        }
    }

    /// Returns every pending transaction without removing it (used to answer
    /// `GET /pending`).
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.entries.values().map(|e| e.tx.clone()).collect()
    }
}

fn debit_amount(tx: &Transaction) -> u64 {
    match tx.tx_type {
        TxType::Transfer | TxType::Stake => tx.amount.saturating_add(tx.fee),
        TxType::Unstake => tx.fee,
        TxType::Genesis | TxType::Reward | TxType::Fee => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn transfer(kp: &Keypair, fee: u64, ts: u64) -> Transaction {
        Transaction::new(
            TxType::Transfer,
            kp.address(),
            Address::from_raw("GRS_recipient"),
            100,
            fee,
            ts,
            Some(&kp.secret_key),
        )
        .unwrap()
    }

    #[test]
    fn submit_and_drain_orders_by_fee_then_arrival() {
        let kp = Keypair::generate();
        let mut pool = Mempool::new(10);
        let low = transfer(&kp, 1, 1);
        let high = transfer(&kp, 5, 2);
        pool.submit(low.clone(), 10_000).unwrap();
        pool.submit(high.clone(), 10_000).unwrap();

        let drained = pool.drain(10);
        assert_eq!(drained[0].tx_id, high.tx_id);
        assert_eq!(drained[1].tx_id, low.tx_id);
        assert!(pool.is_empty());
    }

    #[test]
    fn submit_rejects_duplicate() {
        let kp = Keypair::generate();
        let mut pool = Mempool::new(10);
        let tx = transfer(&kp, 1, 1);
        pool.submit(tx.clone(), 10_000).unwrap();
        let err = pool.submit(tx.clone(), 10_000).unwrap_err();
        assert_eq!(err, MempoolError::Duplicate(tx.tx_id));
    }

    #[test]
    fn pending_spend_prevents_concurrent_overdraw() {
        let kp = Keypair::generate();
        let mut pool = Mempool::new(10);
        pool.submit(transfer(&kp, 0, 1), 150).unwrap();
        let err = pool.submit(transfer(&kp, 0, 2), 150).unwrap_err();
        assert_eq!(err, MempoolError::InsufficientBalance);
    }

    #[test]
    fn cap_evicts_lowest_fee_first() {
        let kp = Keypair::generate();
        let mut pool = Mempool::new(1);
        let low = transfer(&kp, 1, 1);
        let high = transfer(&kp, 5, 2);
        pool.submit(low.clone(), 10_000).unwrap();
        pool.submit(high.clone(), 10_000).unwrap();

        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&high.tx_id));
        assert!(!pool.contains(&low.tx_id));
    }

    #[test]
    fn system_transactions_are_not_submittable() {
        let tx = Transaction::new(
            TxType::Reward,
            Address::system(),
            Address::from_raw("GRS_validator"),
            50,
            0,
            1,
            None,
        )
        .unwrap();
        let mut pool = Mempool::new(10);
        let err = pool.submit(tx, 0).unwrap_err();
        assert_eq!(err, MempoolError::NotSubmittable);
    }
}
