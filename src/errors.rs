use axum::response::{IntoResponse, Response};
use hyper::StatusCode;
use thiserror::Error;

/// Failures that are surfaced to the caller. Seat and queue precondition
/// failures are deliberately absent: those are silent no-ops that produce no
/// state change and no broadcast.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No verified identity is attached to this connection")]
    Unauthenticated,

    #[error("Room {0} already exists")]
    AlreadyExists(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

impl GatewayError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::AlreadyExists(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}
