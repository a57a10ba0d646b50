//! Proof-of-stake ledger node binary.
//!
//! Wires together the `chain` crate's storage, consensus, mempool, and
//! peer-network building blocks into a runnable validator node: loads (or
//! bootstraps) the chain, starts the HTTP peer-network server, the
//! Prometheus metrics exporter, the block-production loop, and the
//! longest-valid-chain sync loop.
//!
//! Exit codes: `0` clean shutdown, `1` fatal startup failure (storage
//! corrupt, port in use), `2` an unrecoverable panic in the main loop.

mod config;
mod error;
mod identity;
mod orchestrator;
mod routes;
mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tokio::signal;

use chain::{Block, Chain, ChainStorage, GENESIS_FOUNDER_SUPPLY, Mempool, MetricsRegistry, PeerRegistry, run_prometheus_http_server};

use config::Cli;
use state::{AppState, SharedState};

const MEMPOOL_CAP: usize = 100_000;

fn main() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("fatal panic in node main loop: {info}");
        std::process::exit(2);
    }));

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let exit_code = runtime.block_on(run());
    std::process::exit(exit_code);
}

async fn run() -> i32 {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "node=info,chain=info".to_string()))
        .init();

    let cli = Cli::parse();
    let listen_addr = cli.listen_addr();
    let bootstrap_peers = cli.peers.clone();
    let node_cfg = cli.into_node_config();

    let data_dir = Path::new(&node_cfg.storage.path);
    let keypair = match identity::load_or_create(data_dir) {
        Ok(kp) => kp,
        Err(e) => {
            tracing::error!("failed to load or create node identity: {e}");
            return 1;
        }
    };
    let node_id = keypair.address().as_str().to_string();

    let storage = match ChainStorage::open(&node_cfg.storage) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to open storage at {}: {e}", node_cfg.storage.path);
            return 1;
        }
    };

    let chain = match storage.load(node_cfg.consensus.clone()) {
        Ok(Some(chain)) => {
            tracing::info!(height = chain.height(), "loaded chain from storage");
            chain
        }
        Ok(None) => {
            let timestamp = current_unix_timestamp();
            let genesis = match Block::genesis(keypair.address(), GENESIS_FOUNDER_SUPPLY, timestamp) {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("failed to build genesis block: {e}");
                    return 1;
                }
            };
            let chain = match Chain::new(genesis, node_cfg.consensus.clone()) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("failed to initialize chain from genesis: {e}");
                    return 1;
                }
            };
            if let Err(e) = storage.save_snapshot(&chain) {
                tracing::error!("failed to persist bootstrap genesis: {e}");
                return 1;
            }
            tracing::info!(founder = %keypair.address(), "bootstrapped fresh chain with genesis block");
            chain
        }
        Err(e) => {
            tracing::error!("storage failed sanity check on load: {e}");
            return 1;
        }
    };

    let metrics = match MetricsRegistry::new() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            tracing::error!("failed to initialize metrics registry: {e}");
            return 1;
        }
    };
    metrics.node.chain_height.set(chain.height() as f64);

    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    let mut peers = PeerRegistry::new();
    let now = current_unix_timestamp();
    for peer in bootstrap_peers {
        peers.register(peer, now);
    }
    metrics.node.peer_count.set(peers.len() as f64);

    let http_client = reqwest::Client::new();
    let block_interval = node_cfg.consensus.block_interval_target;
    let sync_interval = node_cfg.network.sync_interval_secs;

    let mut mempool = Mempool::new(MEMPOOL_CAP);
    match storage.get_pending() {
        Ok(pending) => {
            let mut restored = 0usize;
            let mut stale = Vec::new();
            for tx in pending {
                let balance = chain.balance(&tx.sender);
                match mempool.submit(tx.clone(), balance) {
                    Ok(()) => restored += 1,
                    Err(e) => {
                        tracing::debug!("dropping stale persisted pending transaction {}: {e}", tx.tx_id);
                        stale.push(tx.tx_id);
                    }
                }
            }
            if !stale.is_empty() {
                if let Err(e) = storage.drop_pending(&stale) {
                    tracing::warn!("failed to prune stale persisted pending transactions: {e}");
                }
            }
            tracing::info!(restored, "reloaded pending transaction pool from storage");
        }
        Err(e) => {
            tracing::error!("failed to reload pending transaction pool: {e}");
            return 1;
        }
    }

    let app_state: SharedState = Arc::new(AppState {
        chain: tokio::sync::RwLock::new(chain),
        mempool: tokio::sync::Mutex::new(mempool),
        peers: tokio::sync::Mutex::new(peers),
        storage,
        storage_write_lock: tokio::sync::Mutex::new(()),
        keypair,
        node_id,
        metrics,
        http_client,
        config: node_cfg,
    });

    {
        let producer_state = app_state.clone();
        tokio::spawn(async move {
            orchestrator::run_block_producer(producer_state, block_interval).await;
        });
    }
    {
        let sync_state = app_state.clone();
        tokio::spawn(async move {
            orchestrator::run_sync_loop(sync_state, sync_interval).await;
        });
    }

    let app = routes::router(app_state.clone());

    tracing::info!(node_id = %app_state.node_id, "node listening on http://{listen_addr}");
    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {listen_addr}: {e}");
            return 1;
        }
    };

    let serve_result = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await;

    orchestrator::snapshot_chain(&app_state).await;

    if let Err(e) = serve_result {
        tracing::error!("HTTP server error: {e}");
        return 1;
    }

    tracing::info!("clean shutdown complete");
    0
}

fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Waits for Ctrl-C or a POSIX terminate signal, for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
