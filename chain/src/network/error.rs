//! Errors surfaced by the peer-network layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("peer {0} is unreachable")]
    PeerUnreachable(String),
    #[error("request to peer {0} timed out")]
    PeerTimeout(String),
    #[error("malformed message from peer: {0}")]
    MalformedMessage(String),
}

impl NetworkError {
    pub(crate) fn from_reqwest(peer: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::PeerTimeout(peer.to_string())
        } else {
            NetworkError::PeerUnreachable(peer.to_string())
        }
    }
}
