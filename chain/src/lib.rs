//! Chain library crate.
//!
//! This crate provides the core building blocks for a permissionless,
//! replicated proof-of-stake ledger:
//!
//! - strongly-typed domain types (`types`),
//! - cryptographic primitives (`crypto`),
//! - the token ledger state machine (`ledger`),
//! - stake-weighted validator election (`consensus`),
//! - the append-only chain and fork choice (`chain`),
//! - a fee-ordered pending-transaction pool (`mempool`),
//! - durable RocksDB-backed storage (`storage`),
//! - peer networking: registry, gossip, and sync (`network`),
//! - Prometheus-based metrics (`metrics`),
//! - and top-level node configuration (`config`).
//!
//! The `node` binary crate composes these pieces into a runnable validator
//! node.

pub mod chain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod mempool;
pub mod metrics;
pub mod network;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{MetricsConfig, NetworkConfig, NodeConfig};

// Re-export the chain and its fork-choice rule.
pub use chain::{Chain, ValidationError, is_better_chain};

// Re-export consensus (validator election).
pub use consensus::{ConsensusConfig, ConsensusError, expected_proposer, is_validator, proposer_for, validators};

// Re-export the token ledger.
pub use ledger::{
    GENESIS_FOUNDER_SUPPLY, LedgerError, MAX_SUPPLY, MIN_STAKE, STAKE_LOCK_SECONDS, Stake, TokenLedger,
};

// Re-export the mempool.
pub use mempool::{Mempool, MempoolError};

// Re-export storage.
pub use storage::{ChainStorage, StorageConfig, StorageError};

// Re-export the peer network.
pub use network::{NetworkError, PeerInfo, PeerRegistry};

// Re-export metrics registry and node metrics.
pub use metrics::{MetricsRegistry, NodeMetrics, run_prometheus_http_server};

// Re-export domain types and crypto primitives at the crate root for
// convenience.
pub use crypto::{CryptoError, Keypair};
pub use types::*;
