//! CLI surface of the node orchestrator binary.
//!
//! Parses flags with `clap`'s derive API and maps them onto `chain`'s
//! `NodeConfig`, per the single-explicit-struct configuration policy (no
//! string-keyed option bags).

use std::net::SocketAddr;

use chain::{MetricsConfig, NetworkConfig, NodeConfig, StorageConfig};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "node", about = "Proof-of-stake ledger peer node")]
pub struct Cli {
    /// Port this node's peer-network HTTP server listens on.
    #[arg(long, default_value_t = 5000)]
    pub port: u16,

    /// Directory holding this node's RocksDB data.
    #[arg(long, default_value = "./data")]
    pub data_dir: String,

    /// Run with the lighter testnet profile (lower MIN_STAKE, faster
    /// block cadence and sync interval), for integration testing.
    #[arg(long, default_value_t = false)]
    pub testnet: bool,

    /// Bootstrap peer URL, e.g. `http://127.0.0.1:5001`. May be repeated.
    #[arg(long = "peer")]
    pub peers: Vec<String>,
}

impl Cli {
    /// Builds the node's full configuration from parsed flags.
    pub fn into_node_config(self) -> NodeConfig {
        if self.testnet {
            let mut cfg = NodeConfig::testnet(self.data_dir, self.port);
            cfg.network.bootstrap_peers = self.peers;
            return cfg;
        }

        NodeConfig {
            consensus: Default::default(),
            storage: StorageConfig {
                path: self.data_dir,
                create_if_missing: true,
            },
            network: NetworkConfig {
                port: self.port,
                bootstrap_peers: self.peers,
                ..Default::default()
            },
            metrics: MetricsConfig::default(),
        }
    }

    /// Address the peer-network HTTP server binds to, derived from `--port`.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}
