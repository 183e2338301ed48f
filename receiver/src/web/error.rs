//! Request-terminal webhook errors and their HTTP mapping.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::delivery::DecodeError;

/// Every way a webhook request can end without a 200.
///
/// The `Display` text is the exact plain-text response body.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Verify token did not match")]
    TokenMismatch,

    #[error("Missing hub.challenge parameter")]
    MissingChallenge,

    #[error("{message}")]
    BodyRead { status: StatusCode, message: String },

    #[error("{0}")]
    BodyDecode(#[from] DecodeError),

    #[error("Update consumer unavailable")]
    ConsumerGone,

    #[error("Update delivery aborted")]
    DeliveryAborted,

    #[error("Method Not Allowed")]
    UnsupportedMethod,
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::TokenMismatch => StatusCode::UNAUTHORIZED,
            WebhookError::MissingChallenge => StatusCode::BAD_REQUEST,
            WebhookError::BodyRead { status, .. } => *status,
            WebhookError::BodyDecode(_) => StatusCode::BAD_REQUEST,
            WebhookError::ConsumerGone => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::DeliveryAborted => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.to_string();

        if let WebhookError::UnsupportedMethod = self {
            return (status, [(header::ALLOW, "GET, POST")], body).into_response();
        }
        (status, body).into_response()
    }
}
