//! Fan-out broadcast of transactions and blocks to every known peer.
//!
//! Each request carries a 5-second timeout per the node's outbound-call
//! policy. Failures are not propagated to the caller as a whole-broadcast
//! error — a single unreachable peer must not stall gossip for the rest —
//! they are returned per-peer so the orchestrator can log them.

use std::time::Duration;

use reqwest::Client;

use super::dto::{BlockRequest, TransactionRequest};
use super::error::NetworkError;
use crate::types::{Block, Transaction};

const GOSSIP_TIMEOUT: Duration = Duration::from_secs(5);

/// Broadcasts `tx` to every peer in `peers`, returning one result per peer
/// in the same order.
pub async fn broadcast_transaction(
    client: &Client,
    peers: &[String],
    tx: &Transaction,
) -> Vec<(String, Result<(), NetworkError>)> {
    let body = TransactionRequest { transaction: tx.clone() };
    let mut results = Vec::with_capacity(peers.len());
    for peer in peers {
        let outcome = post_json(client, peer, "/transaction", &body).await;
        results.push((peer.clone(), outcome));
    }
    results
}

/// Broadcasts `block` to every peer in `peers`, returning one result per
/// peer in the same order.
pub async fn broadcast_block(
    client: &Client,
    peers: &[String],
    block: &Block,
) -> Vec<(String, Result<(), NetworkError>)> {
    let body = BlockRequest { block: block.clone() };
    let mut results = Vec::with_capacity(peers.len());
    for peer in peers {
        let outcome = post_json(client, peer, "/block", &body).await;
        results.push((peer.clone(), outcome));
    }
    results
}

async fn post_json<T: serde::Serialize>(
    client: &Client,
    peer: &str,
    path: &str,
    body: &T,
) -> Result<(), NetworkError> {
    let url = format!("{peer}{path}");
    client
        .post(&url)
        .timeout(GOSSIP_TIMEOUT)
        .json(body)
        .send()
        .await
        .map_err(|e| NetworkError::from_reqwest(peer, e))?;
    Ok(())
}
