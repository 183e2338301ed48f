//! Webhook endpoint handlers.
//!
//! One endpoint, dispatched on method:
//! 1. GET answers the subscription handshake
//! 2. POST decodes push notifications and hands every event to the consumer
//! 3. Anything else is rejected with 405
//!
//! The POST response is only written once every event has been accepted by
//! the delivery channel.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    http::Method,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info, warn};
use url::form_urlencoded;

use crate::delivery::{self, DecodeError, Delivery, UpdateReceiver, UpdateSender};
use crate::update::UpdateRequest;
use crate::web::error::WebhookError;
use crate::web::verify::verify_token_matches;

/// State shared by every request served by one webhook.
#[derive(Clone)]
pub struct WebhookState {
    verify_token: Arc<str>,
    updates: UpdateSender,
}

impl WebhookState {
    /// Create the state together with the receiving end of its updates.
    ///
    /// `capacity == 0` makes every POST wait for the consumer to take each
    /// event; see [`delivery::channel`].
    pub fn new(verify_token: impl Into<String>, capacity: usize) -> (Self, UpdateReceiver) {
        let (updates, receiver) = delivery::channel(capacity);
        let verify_token: String = verify_token.into();
        (
            Self {
                verify_token: Arc::from(verify_token),
                updates,
            },
            receiver,
        )
    }
}

/// Build the webhook router, mounted at `path`.
pub fn webhook_router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(
            path,
            get(verify_subscription)
                .post(receive_updates)
                .fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Set up a webhook at `/` with a rendezvous delivery channel.
pub fn setup_webhook(verify_token: impl Into<String>) -> (Router, UpdateReceiver) {
    let (state, updates) = WebhookState::new(verify_token, 0);
    (webhook_router("/", state), updates)
}

// =============================================================================
// Health Check
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Subscription Handshake
// =============================================================================

/// Query parameters of the subscription handshake.
#[derive(Debug, Default, PartialEq)]
pub struct VerifyQuery {
    pub mode: Option<String>,
    pub verify_token: Option<String>,
    pub challenge: Option<String>,
}

impl VerifyQuery {
    /// Parse a raw query string. The first occurrence of a key wins and
    /// anything unparseable is ignored.
    pub fn parse(raw: &str) -> Self {
        let mut query = Self::default();
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let slot = match &*key {
                "hub.mode" => &mut query.mode,
                "hub.verify_token" => &mut query.verify_token,
                "hub.challenge" => &mut query.challenge,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        query
    }
}

/// GET handler for the subscription handshake.
///
/// Echoes `hub.challenge` back when `hub.verify_token` matches.
pub async fn verify_subscription(
    State(state): State<WebhookState>,
    RawQuery(raw): RawQuery,
) -> Result<String, WebhookError> {
    let query = raw.as_deref().map(VerifyQuery::parse).unwrap_or_default();

    info!(
        mode = ?query.mode,
        has_verify_token = query.verify_token.is_some(),
        has_challenge = query.challenge.is_some(),
        "webhook_verify_received"
    );

    let provided = query.verify_token.as_deref().unwrap_or_default();
    if !verify_token_matches(&state.verify_token, provided) {
        warn!("webhook_verify_token_mismatch");
        return Err(WebhookError::TokenMismatch);
    }

    match query.challenge {
        Some(challenge) if !challenge.is_empty() => {
            info!(challenge_length = challenge.len(), "webhook_verified");
            Ok(challenge)
        }
        _ => {
            warn!("webhook_verify_challenge_missing");
            Err(WebhookError::MissingChallenge)
        }
    }
}

// =============================================================================
// Event Delivery
// =============================================================================

/// POST handler for push notifications.
///
/// This endpoint:
/// 1. Decodes the body as an [`UpdateRequest`]
/// 2. Sends each event, entry by entry, to the consumer
/// 3. Returns 200 OK once all of them were taken
///
/// An undecodable body is answered with 400 and reported to the consumer as
/// a single [`Delivery::DecodeFailed`].
///
/// Sending runs on its own task, so a client that hangs up mid-batch does
/// not cancel delivery of the remaining events.
pub async fn receive_updates(
    State(state): State<WebhookState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<&'static str, WebhookError> {
    let body = body.map_err(|rejection| {
        warn!(
            error = %rejection,
            status = rejection.status().as_u16(),
            "webhook_body_read_failed"
        );
        WebhookError::BodyRead {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    })?;

    let request: UpdateRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let decode = DecodeError::from(&e);
            warn!(
                error = %decode,
                line = decode.line,
                column = decode.column,
                body_length = body.len(),
                "webhook_body_decode_failed"
            );

            let report = tokio::spawn(report_decode_failure(
                state.updates.clone(),
                decode.clone(),
            ));
            if let Err(e) = report.await {
                error!(error = %e, "webhook_decode_failure_task_failed");
            }
            return Err(WebhookError::BodyDecode(decode));
        }
    };

    info!(
        object = %request.object,
        entries = request.entries.len(),
        events = request.event_count(),
        "webhook_updates_received"
    );

    let delivery = tokio::spawn(deliver_events(state.updates.clone(), request));
    match delivery.await {
        Ok(result) => result?,
        Err(e) => {
            error!(error = %e, "webhook_delivery_task_failed");
            return Err(WebhookError::DeliveryAborted);
        }
    }

    Ok("OK")
}

async fn report_decode_failure(updates: UpdateSender, decode: DecodeError) {
    if updates.send(Delivery::DecodeFailed(decode)).await.is_err() {
        error!("webhook_decode_failure_undelivered");
    }
}

/// Send every event of a request, in order, until done or the consumer is gone.
async fn deliver_events(
    updates: UpdateSender,
    request: UpdateRequest,
) -> Result<(), WebhookError> {
    let events = request.event_count();

    for (delivered, update) in request.into_events().enumerate() {
        if updates.send(Delivery::Update(update)).await.is_err() {
            error!(
                delivered = delivered,
                events = events,
                "webhook_consumer_gone"
            );
            return Err(WebhookError::ConsumerGone);
        }
    }

    info!(events = events, "webhook_updates_delivered");
    Ok(())
}

/// Fallback for every method other than GET and POST.
pub async fn method_not_allowed(method: Method) -> WebhookError {
    warn!(method = %method, "webhook_method_not_allowed");
    WebhookError::UnsupportedMethod
}
