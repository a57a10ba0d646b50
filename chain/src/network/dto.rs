//! Wire payloads exchanged between peers.
//!
//! These mirror the endpoint table in the top-level interface spec; field
//! names and shapes are part of the wire contract and must not be renamed
//! without a protocol version bump.

use serde::{Deserialize, Serialize};

use crate::types::{Block, Transaction};

/// Current `CARGO_PKG_VERSION` of the `chain` crate, advertised in `/ping`.
pub const NODE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: u64,
    pub node_id: String,
    pub version: String,
    pub chain_length: u64,
}

#[derive(Serialize, Deserialize)]
pub struct BlocksResponse {
    pub blocks: Vec<Block>,
}

#[derive(Serialize, Deserialize)]
pub struct BlockResponse {
    pub block: Block,
}

#[derive(Serialize, Deserialize)]
pub struct PendingResponse {
    pub transactions: Vec<Transaction>,
}

#[derive(Serialize, Deserialize)]
pub struct TransactionRequest {
    pub transaction: Transaction,
}

#[derive(Serialize, Deserialize)]
pub struct BlockRequest {
    pub block: Block,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        StatusResponse { status: "ok".to_string() }
    }
}

#[derive(Serialize, Deserialize)]
pub struct RegisterNodesRequest {
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub total_nodes: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
