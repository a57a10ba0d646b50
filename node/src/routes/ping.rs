use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::State;

use chain::network::{NODE_VERSION, PingResponse};

use crate::state::SharedState;

/// `GET /ping` — liveness plus the advertised node id, version, and chain
/// length.
pub async fn ping(State(state): State<SharedState>) -> Json<PingResponse> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let chain_length = state.chain.read().await.len() as u64;

    Json(PingResponse {
        status: "ok".to_string(),
        timestamp,
        node_id: state.node_id.clone(),
        version: NODE_VERSION.to_string(),
        chain_length,
    })
}
