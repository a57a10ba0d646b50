mod blocks;
mod health;
mod message;
mod nodes;
mod pending;
mod ping;
mod transactions;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};

use crate::state::SharedState;

/// Builds the full peer-network + health router for the node.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ping", get(ping::ping))
        .route("/blocks", get(blocks::get_blocks))
        .route("/block/{hash}", get(blocks::get_block))
        .route("/pending", get(pending::get_pending))
        .route("/transaction", post(transactions::submit_transaction))
        .route("/block", post(blocks::submit_block))
        .route("/nodes/register", post(nodes::register_nodes))
        .route("/message", post(message::handle_message))
        .layer(middleware::from_fn_with_state(state.clone(), node_id_header))
        .with_state(state)
}

/// Sets `X-Node-ID` on every response, per the wire-format contract.
async fn node_id_header(State(state): State<SharedState>, req: axum::extract::Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&state.node_id) {
        response.headers_mut().insert(HeaderName::from_static("x-node-id"), value);
    }
    response
}
