//! Update model and normalizer.
//!
//! This module provides:
//! - Wire types for webhook push notifications
//! - Normalization of any update into one canonical text string
//!
//! ## Flow
//!
//! ```text
//! POST body → UpdateRequest → entries → Update → normalized_text_message()
//! ```

pub mod normalize;
pub mod types;

pub use normalize::{canonical_url, is_postback, normalized_text_message};
pub use types::{
    Attachment, Coordinates, LocationPayload, MediaPayload, Message, Participant, Postback,
    QuickReply, TemplateButton, TemplateElement, TemplatePayload, Update, UpdateEntry,
    UpdateRequest,
};
