//! Webhook protocol handler.
//!
//! This module provides the single webhook endpoint that:
//! - Answers the GET subscription handshake
//! - Decodes POSTed push notifications
//! - Hands every event to the consumer before answering 200 OK

pub mod error;
pub mod handlers;
pub mod verify;

pub use error::WebhookError;
pub use handlers::{
    health, method_not_allowed, receive_updates, setup_webhook, verify_subscription,
    webhook_router, HealthResponse, VerifyQuery, WebhookState,
};
pub use verify::verify_token_matches;
