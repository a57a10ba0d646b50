//! Shared application state held by HTTP handlers and background tasks.

use std::sync::Arc;

use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use chain::{Chain, ChainStorage, Keypair, MetricsRegistry, NodeConfig, PeerRegistry};

/// Shared state held by the peer-network API and background tasks.
///
/// Per the concurrency model, the chain/ledger pair is the only globally
/// shared mutable state guarded by a single read/write lock; the mempool
/// and peer registry are separate, independently-locked resources.
pub struct AppState {
    pub chain: RwLock<Chain>,
    pub mempool: Mutex<chain::Mempool>,
    pub peers: Mutex<PeerRegistry>,
    pub storage: ChainStorage,
    /// Serializes storage writes; reads go through `storage` directly.
    pub storage_write_lock: Mutex<()>,
    pub keypair: Keypair,
    pub node_id: String,
    pub metrics: Arc<MetricsRegistry>,
    pub http_client: Client,
    pub config: NodeConfig,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
