use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct TypedMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub body: Value,
}

/// `POST /message` — typed RPC dispatch. Only `"ping"` is handled by this
/// core; any other `type` is rejected as unrecognized rather than silently
/// accepted, since handler registration is out of scope for this core.
pub async fn handle_message(
    State(state): State<SharedState>,
    Json(msg): Json<TypedMessage>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    match msg.kind.as_str() {
        "ping" => {
            let chain_length = state.chain.read().await.len() as u64;
            Ok((
                StatusCode::OK,
                Json(serde_json::json!({ "type": "pong", "chain_length": chain_length })),
            ))
        }
        other => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "unknown_message_type",
            format!("no handler registered for message type {other:?}"),
        )),
    }
}
