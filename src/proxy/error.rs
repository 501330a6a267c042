//! Request-level errors raised before anything is forwarded.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::proxy::request::ValidationError;
use crate::proxy::response::ProxyResponse;

/// Failures the gateway reports on its own behalf.
///
/// Upstream failures are not here: they travel inside [`ProxyResponse`].
/// Unexpected failures surface as panics and become the generic 500 body in
/// [`crate::http::response::handle_panic`].
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid service: {service}. Available services: {}", .available.join(", "))]
    UnknownService {
        service: String,
        available: Vec<String>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Request body too large")]
    PayloadTooLarge,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::UnknownService { .. } | GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
            GatewayError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejected proxy request");
        let status = self.status_code();
        (status, Json(ProxyResponse::failure(self.to_string(), None))).into_response()
    }
}
