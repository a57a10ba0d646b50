//! HTTP-facing error mapping for the peer-network API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use chain::network::ErrorBody;
use chain::{MempoolError, ValidationError};

/// Request-scoped error with the status code it should map to.
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into() }
    }

    pub fn not_found(kind: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, kind, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.kind.to_string(), message: self.message };
        (self.status, Json(body)).into_response()
    }
}

/// Maps a mempool admission failure onto the `/transaction` status codes
/// (400 for malformed/rejected, 409 for a duplicate).
impl From<MempoolError> for ApiError {
    fn from(err: MempoolError) -> Self {
        let status = match err {
            MempoolError::Duplicate(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, "transaction_rejected", err.to_string())
    }
}

/// Maps a block validation failure onto the `/block` status codes (400 for
/// most validation failures, 409 for an orphan block that doesn't connect
/// to the current tip).
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        let status = match err {
            ValidationError::BadIndex { .. } | ValidationError::BadPreviousHash => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::new(status, "block_rejected", err.to_string())
    }
}
