use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use chain::network::{RegisterNodesRequest, RegisterNodesResponse};

use crate::state::SharedState;

/// `POST /nodes/register` — learn of one or more peers.
pub async fn register_nodes(
    State(state): State<SharedState>,
    Json(req): Json<RegisterNodesRequest>,
) -> (StatusCode, Json<RegisterNodesResponse>) {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut peers = state.peers.lock().await;
    for url in req.nodes {
        peers.register(url, now);
    }
    let total_nodes = peers.len();
    drop(peers);

    state.metrics.node.peer_count.set(total_nodes as f64);

    (StatusCode::CREATED, Json(RegisterNodesResponse { total_nodes }))
}
