//! RocksDB-backed chain storage.
//!
//! Column families, one per persisted entity:
//!
//! - `"blocks"`: `block.hash` -> canonical-JSON `Block`.
//! - `"transactions"`: `tx_id` -> `(Transaction, block_hash)`.
//! - `"by_address"`: `address` -> ordered list of `tx_id`s, a denormalized
//!   index kept for fast `transactions_for` lookups without replaying
//!   the whole chain.
//! - `"balances"` / `"stakes"`: address -> amount / stake snapshot, rebuilt
//!   from the ledger on every `save_snapshot` (optional, rebuildable).
//! - `"meta"`: fixed keys, currently just `"tip"` (the current tip hash).
//! - `"pending"`: `tx_id` -> `Transaction`, the mempool's persisted snapshot.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::{Chain, ValidationError};
use crate::consensus::ConsensusConfig;
use crate::ledger::Stake;
use crate::types::{Address, Hash256, Transaction};

const CF_BLOCKS: &str = "blocks";
const CF_TRANSACTIONS: &str = "transactions";
const CF_BY_ADDRESS: &str = "by_address";
const CF_BALANCES: &str = "balances";
const CF_STAKES: &str = "stakes";
const CF_META: &str = "meta";
const CF_PENDING: &str = "pending";

const KEY_TIP: &[u8] = b"tip";

/// Configuration for [`ChainStorage`].
#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/chain-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// Storage-level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("failed to (de)serialize a stored value: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("required column family {0:?} is missing")]
    MissingColumnFamily(&'static str),
    #[error("stored data is corrupt: {0}")]
    Corrupt(&'static str),
    #[error("persisted chain failed replay validation: {0}")]
    ChainInvalid(#[from] ValidationError),
}

#[derive(Serialize, Deserialize)]
struct StoredTx {
    tx: Transaction,
    block_hash: Hash256,
}

/// Durable, crash-safe chain storage.
///
/// `save_snapshot` is the sole write path and replaces the prior snapshot
/// atomically (a single RocksDB write batch across every affected column
/// family); `load` reconstructs a [`Chain`] by replaying persisted blocks
/// in index order, so `load(save_snapshot(chain)) == chain` holds for the
/// chain's blocks and derived ledger alike.
pub struct ChainStorage {
    db: DB,
}

impl ChainStorage {
    /// Opens (or creates) chain storage at the configured path.
    pub fn open(cfg: &StorageConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = [
            "default",
            CF_BLOCKS,
            CF_TRANSACTIONS,
            CF_BY_ADDRESS,
            CF_BALANCES,
            CF_STAKES,
            CF_META,
            CF_PENDING,
        ]
        .iter()
        .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
        .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db })
    }

    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>, StorageError> {
        self.db.cf_handle(name).ok_or(StorageError::MissingColumnFamily(name))
    }

    /// Atomically replaces the persisted snapshot with `chain`'s current
    /// state: every block, every transaction (plus the by-address index),
    /// a rebuilt balances/stakes snapshot, and the tip pointer.
    pub fn save_snapshot(&self, chain: &Chain) -> Result<(), StorageError> {
        let cf_blocks = self.cf(CF_BLOCKS)?;
        let cf_txs = self.cf(CF_TRANSACTIONS)?;
        let cf_by_addr = self.cf(CF_BY_ADDRESS)?;
        let cf_balances = self.cf(CF_BALANCES)?;
        let cf_stakes = self.cf(CF_STAKES)?;
        let cf_meta = self.cf(CF_META)?;

        let mut batch = WriteBatch::default();
        for cf in [&cf_blocks, &cf_txs, &cf_by_addr, &cf_balances, &cf_stakes] {
            self.clear_cf(cf, &mut batch);
        }

        let mut by_address: std::collections::HashMap<Address, Vec<Hash256>> = std::collections::HashMap::new();
        for block in chain.blocks() {
            let key = block.hash.as_bytes();
            batch.put_cf(&cf_blocks, key, serde_json::to_vec(block)?);

            for tx in &block.transactions {
                let stored = StoredTx { tx: tx.clone(), block_hash: block.hash };
                batch.put_cf(&cf_txs, tx.tx_id.as_bytes(), serde_json::to_vec(&stored)?);

                if !tx.sender.is_system() {
                    by_address.entry(tx.sender.clone()).or_default().push(tx.tx_id);
                }
                by_address.entry(tx.recipient.clone()).or_default().push(tx.tx_id);
            }
        }
        for (addr, tx_ids) in &by_address {
            batch.put_cf(&cf_by_addr, addr.as_str().as_bytes(), serde_json::to_vec(tx_ids)?);
        }

        for addr in by_address.keys() {
            let balance = chain.balance(addr);
            batch.put_cf(&cf_balances, addr.as_str().as_bytes(), balance.to_le_bytes());
        }
        for (addr, stake) in chain.ledger().stakes() {
            batch.put_cf(&cf_stakes, addr.as_str().as_bytes(), serde_json::to_vec(stake)?);
        }

        batch.put_cf(&cf_meta, KEY_TIP, chain.tip().hash.as_bytes());

        self.db.write(batch)?;
        Ok(())
    }

    fn clear_cf(&self, cf: &Arc<BoundColumnFamily<'_>>, batch: &mut WriteBatch) {
        let iter = self.db.iterator_cf(cf, IteratorMode::Start);
        for item in iter.flatten() {
            batch.delete_cf(cf, item.0);
        }
    }

    /// Loads the persisted chain, replaying blocks in index order. Returns
    /// `Ok(None)` if no snapshot has ever been saved.
    pub fn load(&self, consensus_cfg: ConsensusConfig) -> Result<Option<Chain>, StorageError> {
        let cf_meta = self.cf(CF_META)?;
        if self.db.get_cf(&cf_meta, KEY_TIP)?.is_none() {
            return Ok(None);
        }

        let cf_blocks = self.cf(CF_BLOCKS)?;
        let mut blocks: Vec<crate::types::Block> = Vec::new();
        for item in self.db.iterator_cf(&cf_blocks, IteratorMode::Start).flatten() {
            let block: crate::types::Block = serde_json::from_slice(&item.1)?;
            blocks.push(block);
        }
        blocks.sort_by_key(|b| b.index);
        if blocks.is_empty() {
            return Err(StorageError::Corrupt("meta tip set but no blocks persisted"));
        }

        let chain = Chain::from_blocks(blocks, consensus_cfg)?;
        Ok(Some(chain))
    }

    /// Point lookup of a persisted balance snapshot (rebuilt on every
    /// `save_snapshot`). Returns 0 for an address with no recorded activity.
    pub fn balance(&self, addr: &Address) -> Result<u64, StorageError> {
        let cf = self.cf(CF_BALANCES)?;
        match self.db.get_cf(&cf, addr.as_str().as_bytes())? {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| StorageError::Corrupt("balance value wrong width"))?;
                Ok(u64::from_le_bytes(arr))
            }
        }
    }

    /// Returns up to `limit` transactions touching `addr`, most recent
    /// first, skipping `offset` entries.
    pub fn transactions_for(
        &self,
        addr: &Address,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transaction>, StorageError> {
        let cf_by_addr = self.cf(CF_BY_ADDRESS)?;
        let Some(bytes) = self.db.get_cf(&cf_by_addr, addr.as_str().as_bytes())? else {
            return Ok(Vec::new());
        };
        let mut tx_ids: Vec<Hash256> = serde_json::from_slice(&bytes)?;
        tx_ids.reverse(); // most-recent-first

        let cf_txs = self.cf(CF_TRANSACTIONS)?;
        let mut out = Vec::with_capacity(limit.min(tx_ids.len()));
        for tx_id in tx_ids.into_iter().skip(offset).take(limit) {
            if let Some(bytes) = self.db.get_cf(&cf_txs, tx_id.as_bytes())? {
                let stored: StoredTx = serde_json::from_slice(&bytes)?;
                out.push(stored.tx);
            }
        }
        Ok(out)
    }

    /// Persists a pending transaction so the mempool survives a restart.
    pub fn append_pending(&self, tx: &Transaction) -> Result<(), StorageError> {
        let cf = self.cf(CF_PENDING)?;
        self.db.put_cf(&cf, tx.tx_id.as_bytes(), serde_json::to_vec(tx)?)?;
        Ok(())
    }

    /// Returns every persisted pending transaction.
    pub fn get_pending(&self) -> Result<Vec<Transaction>, StorageError> {
        let cf = self.cf(CF_PENDING)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start).flatten() {
            out.push(serde_json::from_slice(&item.1)?);
        }
        Ok(out)
    }

    /// Removes pending transactions (e.g. those included in a freshly
    /// appended block) from the persisted pool.
    pub fn drop_pending(&self, tx_ids: &[Hash256]) -> Result<(), StorageError> {
        let cf = self.cf(CF_PENDING)?;
        let mut batch = WriteBatch::default();
        for tx_id in tx_ids {
            batch.delete_cf(&cf, tx_id.as_bytes());
        }
        self.db.write(batch)?;
        Ok(())
    }

    /// Persisted stake snapshot for `addr`, if any. Used by startup to sanity
    /// check a rebuilt ledger against what was last persisted.
    pub fn stake(&self, addr: &Address) -> Result<Option<Stake>, StorageError> {
        let cf = self.cf(CF_STAKES)?;
        match self.db.get_cf(&cf, addr.as_str().as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;
    use crate::types::Block;
    use tempfile::TempDir;

    fn open_storage() -> (TempDir, ChainStorage) {
        let tmp = TempDir::new().expect("create temp dir");
        let cfg = StorageConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        let storage = ChainStorage::open(&cfg).expect("open storage");
        (tmp, storage)
    }

    #[test]
    fn load_on_empty_storage_returns_none() {
        let (_tmp, storage) = open_storage();
        assert!(storage.load(ConsensusConfig::default()).unwrap().is_none());
    }

    #[test]
    fn save_then_load_roundtrips_chain_state() {
        let (_tmp, storage) = open_storage();
        let founder = Keypair::generate();
        let genesis = Block::genesis(founder.address(), 1_000_000 * 100_000_000, 1_700_000_000).unwrap();
        let chain = Chain::new(genesis, ConsensusConfig::default()).unwrap();

        storage.save_snapshot(&chain).unwrap();

        let loaded = storage.load(ConsensusConfig::default()).unwrap().expect("chain present");
        assert_eq!(loaded.height(), chain.height());
        assert_eq!(loaded.balance(&founder.address()), chain.balance(&founder.address()));
        assert_eq!(storage.balance(&founder.address()).unwrap(), chain.balance(&founder.address()));
    }

    #[test]
    fn pending_pool_persists_and_drains() {
        let (_tmp, storage) = open_storage();
        let kp = Keypair::generate();
        let tx = Transaction::new(
            crate::types::TxType::Transfer,
            kp.address(),
            Address::from_raw("GRS_someone"),
            10,
            1,
            1_700_000_000,
            Some(&kp.secret_key),
        )
        .unwrap();

        storage.append_pending(&tx).unwrap();
        let pending = storage.get_pending().unwrap();
        assert_eq!(pending.len(), 1);

        storage.drop_pending(&[tx.tx_id]).unwrap();
        assert!(storage.get_pending().unwrap().is_empty());
    }
}
