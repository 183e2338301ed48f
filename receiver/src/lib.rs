//! msngrhook - Webhook receiver for Messenger-style platform callbacks.
//!
//! The library provides:
//! - `update`: wire types and text normalization of push notifications
//! - `delivery`: the channel handing each event to a consumer
//! - `web`: the axum handler implementing the GET/POST webhook contract
//!
//! ## Architecture
//!
//! ```text
//! Platform → webhook (GET handshake | POST events) → delivery channel → Consumer
//! ```

pub mod config;
pub mod delivery;
pub mod update;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use delivery::{Delivery, DecodeError, UpdateReceiver, UpdateSender};
pub use update::{normalized_text_message, Attachment, Message, Update, UpdateRequest};
pub use web::{setup_webhook, webhook_router, WebhookError, WebhookState};
