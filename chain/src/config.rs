//! Top-level configuration for a chain node.
//!
//! This module aggregates configuration for:
//!
//! - consensus parameters (`ConsensusConfig`),
//! - durable storage (`StorageConfig`),
//! - the peer network (`NetworkConfig`),
//! - the metrics exporter (`MetricsConfig`).
//!
//! `NodeConfig` is the single struct the `node` binary constructs from
//! parsed CLI flags; no string-keyed option bags are used anywhere in this
//! stack.

use std::net::SocketAddr;

use crate::consensus::ConsensusConfig;
use crate::storage::StorageConfig;

/// Peer-network configuration: listen port and bootstrap peers.
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// Port this node's HTTP peer-network server listens on.
    pub port: u16,
    /// Bootstrap peer URLs registered at startup.
    pub bootstrap_peers: Vec<String>,
    /// How often the sync loop polls peers for a longer chain, in seconds.
    pub sync_interval_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            bootstrap_peers: Vec::new(),
            sync_interval_secs: 60,
        }
    }
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a chain node.
///
/// Aggregates all the sub-configs needed to wire up a typical node:
/// consensus tuning (`consensus`), persistent storage (`storage`), the
/// peer network (`network`), and the Prometheus metrics exporter
/// (`metrics`).
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub consensus: ConsensusConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
    pub metrics: MetricsConfig,
}

impl NodeConfig {
    /// The lighter `--testnet` profile: lower stake floor, faster block
    /// cadence, and a faster sync cadence for integration tests.
    pub fn testnet(data_dir: String, port: u16) -> Self {
        Self {
            consensus: ConsensusConfig::testnet(),
            storage: StorageConfig {
                path: data_dir,
                create_if_missing: true,
            },
            network: NetworkConfig {
                port,
                bootstrap_peers: Vec::new(),
                sync_interval_secs: 5,
            },
            metrics: MetricsConfig::default(),
        }
    }
}
