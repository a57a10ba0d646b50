//! Durable, crash-safe persistence for the chain.
//!
//! Backed by RocksDB with one column family per persisted entity (`blocks`,
//! `transactions`, `balances`, `stakes`, `meta`, `pending`), following the
//! column-family-per-table convention. See [`rocksdb_store::ChainStorage`].

mod rocksdb;

pub use rocksdb::{ChainStorage, StorageConfig, StorageError};
