use axum::Json;
use axum::extract::State;

use chain::network::PendingResponse;

use crate::state::SharedState;

/// `GET /pending` — a snapshot of the mempool.
pub async fn get_pending(State(state): State<SharedState>) -> Json<PendingResponse> {
    let transactions = state.mempool.lock().await.snapshot();
    Json(PendingResponse { transactions })
}
