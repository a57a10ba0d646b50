//! Peer registry.
//!
//! A peer is identified by a URL-like string. The registry tracks liveness
//! metadata per peer but never removes one on a single failed request —
//! only the sync loop's staleness grace period does that, and grace-period
//! eviction is left to the orchestrator (this registry just records
//! `last_seen`).

use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct PeerInfo {
    pub node_id: Option<String>,
    pub last_seen: u64,
    pub chain_length: u64,
}

/// Thread-unsafe peer set; the node wraps this in its own mutex per the
/// concurrency model (peer-set mutations are fine-grained and locked
/// separately from the chain/ledger and mempool).
#[derive(Default)]
pub struct PeerRegistry {
    peers: HashMap<String, PeerInfo>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `url` if not already known. Returns `true` if it was newly
    /// added.
    pub fn register(&mut self, url: String, now: u64) -> bool {
        if self.peers.contains_key(&url) {
            return false;
        }
        self.peers.insert(
            url,
            PeerInfo {
                node_id: None,
                last_seen: now,
                chain_length: 0,
            },
        );
        true
    }

    /// Records a successful contact with `url`, updating its liveness and
    /// advertised chain length.
    pub fn mark_seen(&mut self, url: &str, node_id: Option<String>, chain_length: u64, now: u64) {
        let entry = self.peers.entry(url.to_string()).or_insert(PeerInfo {
            node_id: None,
            last_seen: now,
            chain_length: 0,
        });
        entry.last_seen = now;
        entry.chain_length = chain_length;
        if node_id.is_some() {
            entry.node_id = node_id;
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    pub fn info(&self, url: &str) -> Option<&PeerInfo> {
        self.peers.get(url)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_is_idempotent() {
        let mut reg = PeerRegistry::new();
        assert!(reg.register("http://peer-a:5000".to_string(), 1));
        assert!(!reg.register("http://peer-a:5000".to_string(), 2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn mark_seen_updates_chain_length() {
        let mut reg = PeerRegistry::new();
        reg.register("http://peer-a:5000".to_string(), 1);
        reg.mark_seen("http://peer-a:5000", Some("node-1".to_string()), 42, 5);
        let info = reg.info("http://peer-a:5000").unwrap();
        assert_eq!(info.chain_length, 42);
        assert_eq!(info.node_id.as_deref(), Some("node-1"));
    }
}
