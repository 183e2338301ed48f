//! Logging consumer for the delivery channel.
//!
//! Stands in for the business logic that reacts to messages: it drains the
//! channel so POST requests are never held back, and logs each delivery.

use futures::StreamExt;
use tracing::{info, warn};

use msngrhook::{Delivery, UpdateReceiver};

/// Drain deliveries until every sender is gone.
pub async fn run(updates: UpdateReceiver) {
    info!("consumer_started");

    let mut deliveries = Box::pin(updates.into_stream());
    let mut received = 0u64;

    while let Some(delivery) = deliveries.next().await {
        received += 1;
        match delivery {
            Delivery::Update(update) => {
                info!(
                    sender_id = update.sender_id().unwrap_or_default(),
                    recipient_id = update.recipient_id().unwrap_or_default(),
                    timestamp = update.timestamp,
                    is_postback = update.is_postback(),
                    text = %update.normalized_text_message(),
                    "consumer_update_received"
                );
            }
            Delivery::DecodeFailed(err) => {
                warn!(
                    error = %err,
                    line = err.line,
                    column = err.column,
                    "consumer_decode_failure_received"
                );
            }
        }
    }

    info!(received = received, "consumer_stopped");
}
