//! Peer-to-peer networking: peer registry, gossip broadcast, and
//! longest-valid-chain synchronization.
//!
//! This module defines the data and pure logic of the peer network; the
//! actual HTTP server that answers peer requests lives in the `node`
//! binary crate, which wires these pieces into route handlers.

pub mod dto;
mod error;
mod gossip;
mod peer;
mod sync;

pub use dto::{
    BlockRequest, BlockResponse, BlocksResponse, ErrorBody, NODE_VERSION, PendingResponse,
    PingResponse, RegisterNodesRequest, RegisterNodesResponse, StatusResponse, TransactionRequest,
};
pub use error::NetworkError;
pub use gossip::{broadcast_block, broadcast_transaction};
pub use peer::{PeerInfo, PeerRegistry};
pub use sync::{best_candidate, fetch_peer_chain, poll_peers, validate_candidate_chain};
