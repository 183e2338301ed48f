//! Delivery channel between the webhook handler and the update consumer.
//!
//! Every in-flight request holds a clone of [`UpdateSender`]; a single
//! [`UpdateReceiver`] drains them. With capacity `0` the channel is a
//! rendezvous: `send` only completes once the receiver has taken the
//! delivery, so a slow consumer holds back the HTTP response.

use futures::Stream;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::update::Update;

/// One item handed to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// A single event decoded from a POST body
    Update(Update),
    /// A POST body that could not be decoded
    DecodeFailed(DecodeError),
}

impl Delivery {
    pub fn update(&self) -> Option<&Update> {
        match self {
            Delivery::Update(update) => Some(update),
            Delivery::DecodeFailed(_) => None,
        }
    }

    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Delivery::DecodeFailed(err) => Some(err),
            Delivery::Update(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Update, DecodeError> {
        match self {
            Delivery::Update(update) => Ok(update),
            Delivery::DecodeFailed(err) => Err(err),
        }
    }
}

/// Why a webhook body could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl From<&serde_json::Error> for DecodeError {
    fn from(err: &serde_json::Error) -> Self {
        Self {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// The receiving half was dropped before the delivery was taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("update receiver dropped")]
pub struct ConsumerGone;

struct Envelope {
    delivery: Delivery,
    ack: Option<oneshot::Sender<()>>,
}

/// Create a delivery channel.
///
/// `capacity == 0` gives rendezvous semantics; any other value buffers up
/// to `capacity` deliveries before `send` blocks.
pub fn channel(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        UpdateSender {
            tx,
            rendezvous: capacity == 0,
        },
        UpdateReceiver { rx },
    )
}

#[derive(Clone)]
pub struct UpdateSender {
    tx: mpsc::Sender<Envelope>,
    rendezvous: bool,
}

impl UpdateSender {
    /// Hand one delivery to the consumer, waiting as long as it takes.
    pub async fn send(&self, delivery: Delivery) -> Result<(), ConsumerGone> {
        if !self.rendezvous {
            return self
                .tx
                .send(Envelope { delivery, ack: None })
                .await
                .map_err(|_| ConsumerGone);
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Envelope {
                delivery,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| ConsumerGone)?;

        // Dropped unacknowledged only if the receiver went away with it queued
        ack_rx.await.map_err(|_| ConsumerGone)
    }

    pub fn is_rendezvous(&self) -> bool {
        self.rendezvous
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct UpdateReceiver {
    rx: mpsc::Receiver<Envelope>,
}

impl UpdateReceiver {
    /// Wait for the next delivery. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Delivery> {
        let envelope = self.rx.recv().await?;
        Some(Self::accept(envelope))
    }

    /// Take a delivery only if one is already waiting.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok().map(Self::accept)
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery> {
        futures::stream::unfold(self, |mut rx| async move {
            let delivery = rx.recv().await?;
            Some((delivery, rx))
        })
    }

    fn accept(envelope: Envelope) -> Delivery {
        if let Some(ack) = envelope.ack {
            let _ = ack.send(());
        }
        envelope.delivery
    }
}
