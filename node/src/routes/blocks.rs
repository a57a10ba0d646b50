use axum::Json;
use axum::extract::{Path, State};

use chain::network::{BlockRequest, BlockResponse, BlocksResponse, StatusResponse};
use chain::types::Hash256;

use crate::error::ApiError;
use crate::orchestrator;
use crate::state::SharedState;

/// `GET /blocks` — the full chain.
pub async fn get_blocks(State(state): State<SharedState>) -> Json<BlocksResponse> {
    let chain = state.chain.read().await;
    Json(BlocksResponse { blocks: chain.blocks().to_vec() })
}

/// `GET /block/{hash}` — a single block by its hex-encoded hash.
pub async fn get_block(
    State(state): State<SharedState>,
    Path(hash_hex): Path<String>,
) -> Result<Json<BlockResponse>, ApiError> {
    let hash = Hash256::from_hex(&hash_hex)
        .ok_or_else(|| ApiError::not_found("block_not_found", "malformed block hash"))?;
    let chain = state.chain.read().await;
    let block = chain
        .block_by_hash(&hash)
        .cloned()
        .ok_or_else(|| ApiError::not_found("block_not_found", "no block with that hash"))?;
    Ok(Json(BlockResponse { block }))
}

/// `POST /block` — admit a peer-supplied block onto the local chain.
///
/// Single gossiped blocks are evaluated via `Chain::append` only; a block
/// that doesn't connect to the current tip is rejected as an orphan (409)
/// rather than triggering a fork-choice step, which is the sync loop's job.
pub async fn submit_block(
    State(state): State<SharedState>,
    Json(req): Json<BlockRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let now = current_unix_timestamp();
    let tx_ids: Vec<Hash256> = req.block.transactions.iter().map(|tx| tx.tx_id).collect();

    {
        let mut chain = state.chain.write().await;
        chain.append(req.block, now)?;
    }

    orchestrator::snapshot_chain(&state).await;
    state.mempool.lock().await.purge(&tx_ids);
    if let Err(e) = state.storage.drop_pending(&tx_ids) {
        tracing::warn!("failed to drop included transactions from the persisted pending pool: {e}");
    }

    let height = state.chain.read().await.height();
    state.metrics.node.chain_height.set(height as f64);

    Ok(Json(StatusResponse::ok()))
}

fn current_unix_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
