//! Wire types for the platform's webhook push notifications.
//!
//! The envelope is decoded strictly, but attachment payloads are decoded
//! leniently: a payload whose shape does not match its `type` yields empty
//! fields instead of failing the whole request.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Top level wrapper of a POSTed webhook body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateRequest {
    /// Subscription object discriminator, e.g. `"page"`
    #[serde(default, deserialize_with = "null_as_default")]
    pub object: String,
    /// Delivery batches, in platform order
    #[serde(default, rename = "entry", deserialize_with = "null_as_default")]
    pub entries: Vec<UpdateEntry>,
}

impl UpdateRequest {
    /// Total number of events across all entries.
    pub fn event_count(&self) -> usize {
        self.entries.iter().map(|e| e.events.len()).sum()
    }

    /// Consume the request, yielding every event in entry-then-event order.
    pub fn into_events(self) -> impl Iterator<Item = Update> {
        self.entries.into_iter().flat_map(|e| e.events)
    }
}

/// One delivery batch of updates.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UpdateEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: i64,
    #[serde(default, rename = "messaging", deserialize_with = "null_as_default")]
    pub events: Vec<Update>,
}

/// A single user interaction: either a message or a postback.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub sender: Option<Participant>,
    #[serde(default)]
    pub recipient: Option<Participant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub postback: Option<Postback>,
}

impl Update {
    pub fn sender_id(&self) -> Option<&str> {
        self.sender.as_ref().map(|p| p.id.as_str())
    }

    pub fn recipient_id(&self) -> Option<&str> {
        self.recipient.as_ref().map(|p| p.id.as_str())
    }
}

/// Opaque platform identifier of a sender or recipient.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Participant {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
}

/// Message content of an update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub quick_reply: Option<QuickReply>,
}

impl Message {
    pub fn message_id(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn quick_reply_payload(&self) -> Option<&str> {
        self.quick_reply.as_ref().map(|q| q.payload.as_str())
    }
}

/// Button press carrying a fixed payload instead of free text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Postback {
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuickReply {
    #[serde(default, deserialize_with = "null_as_default")]
    pub payload: String,
}

// =============================================================================
// Attachments
// =============================================================================

/// Non-text content attached to a message.
///
/// Known attachment types get a typed payload; anything else is kept as an
/// opaque JSON object under [`Attachment::Unknown`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawAttachment")]
pub enum Attachment {
    Location(LocationPayload),
    Template(TemplatePayload),
    /// `image`, `audio`, `video` or `file`
    Media { kind: String, payload: MediaPayload },
    Unknown {
        kind: String,
        payload: Map<String, Value>,
    },
}

impl Attachment {
    /// The wire `type` tag of this attachment.
    pub fn kind(&self) -> &str {
        match self {
            Attachment::Location(_) => "location",
            Attachment::Template(_) => "template",
            Attachment::Media { kind, .. } | Attachment::Unknown { kind, .. } => kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPayload {
    /// Present only when both `lat` and `long` are numbers
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplatePayload {
    pub template_type: Option<String>,
    pub elements: Vec<TemplateElement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateElement {
    pub title: Option<String>,
    pub buttons: Vec<TemplateButton>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateButton {
    /// Wire `type`, e.g. `web_url` or `element_share`
    pub kind: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaPayload {
    pub url: Option<String>,
}

const MEDIA_KINDS: &[&str] = &["image", "audio", "video", "file"];

/// Attachment exactly as it appears on the wire.
#[derive(Deserialize)]
struct RawAttachment {
    #[serde(default, rename = "type")]
    kind: Value,
    #[serde(default)]
    payload: Value,
}

impl From<RawAttachment> for Attachment {
    fn from(raw: RawAttachment) -> Self {
        let kind = raw.kind.as_str().unwrap_or_default().to_string();
        let payload = match raw.payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        if kind == "location" {
            return Attachment::Location(LocationPayload::from_map(&payload));
        }
        if kind == "template" {
            return Attachment::Template(TemplatePayload::from_map(&payload));
        }
        if MEDIA_KINDS.contains(&kind.as_str()) {
            let url = string_field(&payload, "url");
            return Attachment::Media {
                kind,
                payload: MediaPayload { url },
            };
        }
        Attachment::Unknown { kind, payload }
    }
}

impl LocationPayload {
    fn from_map(payload: &Map<String, Value>) -> Self {
        let coordinates = payload
            .get("coordinates")
            .and_then(Value::as_object)
            .and_then(|c| {
                let lat = c.get("lat").and_then(Value::as_f64)?;
                let long = c.get("long").and_then(Value::as_f64)?;
                Some(Coordinates { lat, long })
            });
        Self { coordinates }
    }
}

impl TemplatePayload {
    fn from_map(payload: &Map<String, Value>) -> Self {
        let elements = payload
            .get("elements")
            .and_then(Value::as_array)
            .map(|elements| elements.iter().map(TemplateElement::from_value).collect())
            .unwrap_or_default();

        Self {
            template_type: string_field(payload, "template_type"),
            elements,
        }
    }
}

impl TemplateElement {
    fn from_value(value: &Value) -> Self {
        let Some(element) = value.as_object() else {
            return Self::default();
        };

        let buttons = element
            .get("buttons")
            .and_then(Value::as_array)
            .map(|buttons| {
                buttons
                    .iter()
                    .map(|b| match b.as_object() {
                        Some(button) => TemplateButton {
                            kind: string_field(button, "type"),
                            title: string_field(button, "title"),
                            url: string_field(button, "url"),
                        },
                        None => TemplateButton::default(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: string_field(element, "title"),
            buttons,
        }
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Treat an explicit JSON `null` like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
