use axum::Json;
use axum::extract::State;

use chain::network::{StatusResponse, TransactionRequest};
use chain::network;

use crate::error::ApiError;
use crate::state::SharedState;

/// `POST /transaction` — admit a client- or peer-submitted transaction into
/// the mempool and gossip it onward.
pub async fn submit_transaction(
    State(state): State<SharedState>,
    Json(req): Json<TransactionRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let tx = req.transaction;
    let balance = state.chain.read().await.balance(&tx.sender);

    {
        let mut mempool = state.mempool.lock().await;
        mempool.submit(tx.clone(), balance)?;
    }
    if let Err(e) = state.storage.append_pending(&tx) {
        tracing::warn!("failed to persist pending transaction {}: {e}", tx.tx_id);
    }
    state.metrics.node.mempool_size.set(state.mempool.lock().await.len() as f64);

    let peers = state.peers.lock().await.urls();
    let results = network::broadcast_transaction(&state.http_client, &peers, &tx).await;
    for (peer, result) in results {
        if let Err(e) = result {
            tracing::debug!(%peer, "transaction gossip failed: {e}");
        }
    }

    Ok(Json(StatusResponse::ok()))
}
