//! Collapse any update into the single string a bot would reply to.
//!
//! ## Precedence
//!
//! ```text
//! postback payload
//!   → first attachment with canonical text (location, share url, media url)
//!     → message text
//!       → ""
//! ```

use tracing::debug;
use url::Url;

use super::types::{Attachment, Coordinates, TemplatePayload, Update};

const GENERIC_TEMPLATE: &str = "generic";
const ELEMENT_SHARE: &str = "element_share";

impl Update {
    /// Whether this update is a postback rather than a message.
    pub fn is_postback(&self) -> bool {
        is_postback(self)
    }

    /// See [`normalized_text_message`].
    pub fn normalized_text_message(&self) -> String {
        normalized_text_message(self)
    }
}

pub fn is_postback(update: &Update) -> bool {
    update.postback.is_some()
}

/// Return the best textual representation of an update.
///
/// Never fails: missing or malformed data degrades to the plain message
/// text, or to an empty string.
pub fn normalized_text_message(update: &Update) -> String {
    if let Some(postback) = &update.postback {
        debug!(rule = "postback", "update_normalized");
        return postback.payload.clone();
    }

    let Some(message) = &update.message else {
        debug!(rule = "empty", "update_normalized");
        return String::new();
    };

    for (index, attachment) in message.attachments.iter().enumerate() {
        if let Some(text) = attachment_text(attachment) {
            debug!(
                rule = "attachment",
                attachment_index = index,
                attachment_type = attachment.kind(),
                "update_normalized"
            );
            return text;
        }
    }

    debug!(rule = "text", has_text = message.text.is_some(), "update_normalized");
    message.text.clone().unwrap_or_default()
}

/// Canonical text of one attachment, or `None` to continue scanning.
fn attachment_text(attachment: &Attachment) -> Option<String> {
    let text = match attachment {
        Attachment::Location(location) => location.coordinates.map(format_coordinates),
        Attachment::Template(template) => shared_element_url(template),
        Attachment::Media { payload, .. } => payload.url.as_deref().and_then(canonical_url),
        Attachment::Unknown { payload, .. } => payload
            .get("url")
            .and_then(|v| v.as_str())
            .and_then(canonical_url),
    };

    text.filter(|t| !t.is_empty())
}

fn format_coordinates(coordinates: Coordinates) -> String {
    format!("{}, {}", coordinates.lat, coordinates.long)
}

/// Url of a shared generic template.
///
/// A button list containing an `element_share` button resolves to the first
/// url-bearing button of that same list.
fn shared_element_url(template: &TemplatePayload) -> Option<String> {
    if template.template_type.as_deref() != Some(GENERIC_TEMPLATE) {
        return None;
    }

    template.elements.iter().find_map(|element| {
        let shared = element
            .buttons
            .iter()
            .any(|b| b.kind.as_deref() == Some(ELEMENT_SHARE));
        if !shared {
            return None;
        }
        element.buttons.iter().find_map(|b| b.url.clone())
    })
}

/// Reduce a URL to `scheme://host[:port]/path`, dropping query and fragment.
///
/// Returns `None` for anything that is not an absolute URL with a host.
pub fn canonical_url(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let host = url.host_str()?;

    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Some(format!("{}://{}{}", url.scheme(), authority, url.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::types::{Message, Postback};

    fn message_with(attachments: serde_json::Value, text: Option<&str>) -> Update {
        let attachments: Vec<Attachment> = serde_json::from_value(attachments).unwrap();
        Update {
            message: Some(Message {
                text: text.map(str::to_string),
                mid: Some("some-value".to_string()),
                attachments,
                quick_reply: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_is_postback() {
        let postback = Update {
            postback: Some(Postback {
                payload: "postback!".to_string(),
                title: None,
            }),
            ..Default::default()
        };
        assert!(postback.is_postback());

        let message = message_with(serde_json::json!([]), Some("message!"));
        assert!(!is_postback(&message));
    }

    #[test]
    fn test_postback_wins_over_message() {
        let mut update = message_with(
            serde_json::json!([{"type": "image", "payload": {"url": "https://example.com/a.png"}}]),
            Some("message!"),
        );
        update.postback = Some(Postback {
            payload: "postback!".to_string(),
            title: Some("Start".to_string()),
        });

        assert_eq!(normalized_text_message(&update), "postback!");
    }

    #[test]
    fn test_empty_update() {
        assert_eq!(Update::default().normalized_text_message(), "");
    }

    #[test]
    fn test_plain_text() {
        let update = message_with(serde_json::json!([]), Some("message!"));
        assert_eq!(normalized_text_message(&update), "message!");
    }

    #[test]
    fn test_message_without_text() {
        let update = message_with(serde_json::json!([]), None);
        assert_eq!(normalized_text_message(&update), "");
    }

    #[test]
    fn test_invalid_url_falls_back_to_text() {
        let update = message_with(
            serde_json::json!([{"type": "image", "payload": {"url": "%%%%%%%%%%%%%%%%%%%%%%%%%%%"}}]),
            Some("message!"),
        );
        assert_eq!(normalized_text_message(&update), "message!");

        let update = message_with(
            serde_json::json!([{"type": "image", "payload": {"url": "%%%%"}}]),
            None,
        );
        assert_eq!(normalized_text_message(&update), "");
    }

    #[test]
    fn test_image_attachment_strips_query() {
        let update = message_with(
            serde_json::json!([{
                "type": "image",
                "payload": {
                    "url": "https://scontent.xx.fbcdn.net/v/t39.1997-6/p100x100/851582_369239386556143_1497813874_n.png?_nc_ad=z-m&oh=52af86654b8cdb071a0d23c2c0208e88&oe=59E9AA4D"
                }
            }]),
            None,
        );
        assert_eq!(
            normalized_text_message(&update),
            "https://scontent.xx.fbcdn.net/v/t39.1997-6/p100x100/851582_369239386556143_1497813874_n.png"
        );
    }

    #[test]
    fn test_location_attachment() {
        let update = message_with(
            serde_json::json!([{
                "type": "location",
                "payload": {"coordinates": {"lat": 52.520007, "long": 13.404954}}
            }]),
            None,
        );
        assert_eq!(normalized_text_message(&update), "52.520007, 13.404954");
    }

    #[test]
    fn test_location_without_coordinates_continues_scanning() {
        let update = message_with(
            serde_json::json!([
                {"type": "location", "payload": {"coordinates": {"lat": 52.520007}}},
                {"type": "image", "payload": {"url": "https://example.com/pic.jpg#frag"}}
            ]),
            Some("message!"),
        );
        assert_eq!(normalized_text_message(&update), "https://example.com/pic.jpg");
    }

    #[test]
    fn test_share_button() {
        let update = message_with(
            serde_json::json!([{
                "type": "template",
                "payload": {
                    "elements": [
                        {
                            "buttons": [
                                {"title": "Open me", "type": "web_url", "url": "http://m.me/foo.bar"},
                                {"type": "element_share"}
                            ]
                        },
                        {"image_url": "http://www.example.net/bar.jpg"},
                        {"title": "some super interesting thing"}
                    ],
                    "sharable": true,
                    "template_type": "generic"
                }
            }]),
            None,
        );
        assert_eq!(normalized_text_message(&update), "http://m.me/foo.bar");
    }

    #[test]
    fn test_template_without_share_button_falls_through() {
        let update = message_with(
            serde_json::json!([{
                "type": "template",
                "payload": {
                    "template_type": "generic",
                    "elements": [{
                        "buttons": [{"type": "web_url", "url": "http://m.me/foo.bar"}]
                    }]
                }
            }]),
            Some("message!"),
        );
        assert_eq!(normalized_text_message(&update), "message!");
    }

    #[test]
    fn test_share_in_later_element() {
        let update = message_with(
            serde_json::json!([{
                "type": "template",
                "payload": {
                    "template_type": "generic",
                    "elements": [
                        {"buttons": [{"type": "web_url", "url": "http://first.example"}]},
                        {"buttons": [
                            {"type": "element_share"},
                            {"type": "web_url", "url": "http://second.example/x"}
                        ]}
                    ]
                }
            }]),
            None,
        );
        assert_eq!(normalized_text_message(&update), "http://second.example/x");
    }

    #[test]
    fn test_unknown_template_type() {
        let update = message_with(
            serde_json::json!([{"type": "template", "payload": {"template_type": "super new"}}]),
            None,
        );
        assert_eq!(normalized_text_message(&update), "");
    }

    #[test]
    fn test_first_matching_attachment_wins() {
        let update = message_with(
            serde_json::json!([
                {"type": "fallback", "payload": {"url": "https://example.com/first?x=1"}},
                {"type": "location", "payload": {"coordinates": {"lat": 1.5, "long": 2.5}}}
            ]),
            Some("message!"),
        );
        assert_eq!(normalized_text_message(&update), "https://example.com/first");
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_url("http://localhost:8080/a/b?c=d#e").as_deref(),
            Some("http://localhost:8080/a/b")
        );
        assert_eq!(
            canonical_url("https://example.com").as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(canonical_url("not a url"), None);
        assert_eq!(canonical_url("mailto:someone@example.com"), None);
    }
}
