//! Message types for the Messenger webhook, the send API and the search API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Webhook Types (from the platform)
// =============================================================================

/// Webhook verification parameters (GET request)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Top-level webhook body (POST request)
///
/// Entries and events stay raw JSON here so one malformed event cannot
/// sink the rest of the batch; see [`WebhookPayload::events`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<serde_json::Value>,
}

/// One page entry; batched deliveries may carry several
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub messaging: Vec<serde_json::Value>,
}

/// Messaging event that could not be decoded
#[derive(Debug)]
pub struct SkippedEvent {
    pub raw: serde_json::Value,
    pub error: serde_json::Error,
}

impl WebhookPayload {
    /// Decode every event of every entry independently
    ///
    /// Returns the events that decoded, in delivery order, and the ones that
    /// did not.
    pub fn events(&self) -> (Vec<MessagingEvent>, Vec<SkippedEvent>) {
        let mut events = Vec::new();
        let mut skipped = Vec::new();

        for raw_entry in &self.entry {
            let entry = match Entry::deserialize(raw_entry) {
                Ok(entry) => entry,
                Err(error) => {
                    skipped.push(SkippedEvent {
                        raw: raw_entry.clone(),
                        error,
                    });
                    continue;
                }
            };

            for raw in entry.messaging {
                let decoded = MessagingEvent::deserialize(&raw);
                match decoded {
                    Ok(event) => events.push(event),
                    Err(error) => skipped.push(SkippedEvent { raw, error }),
                }
            }
        }

        (events, skipped)
    }
}

/// Page-scoped user or page identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
}

/// A single messaging event
///
/// Exactly one of the optional payloads is expected to be set.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagingEvent {
    pub sender: Participant,
    pub recipient: Participant,
    /// Milliseconds since the epoch
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub optin: Option<Optin>,
    #[serde(default)]
    pub message: Option<InboundMessage>,
    #[serde(default)]
    pub delivery: Option<Delivery>,
    #[serde(default)]
    pub postback: Option<Postback>,
    #[serde(default)]
    pub read: Option<Read>,
    #[serde(default)]
    pub account_linking: Option<AccountLinking>,
}

impl MessagingEvent {
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}

/// Authentication (send-to-messenger plugin) event
#[derive(Debug, Clone, Deserialize)]
pub struct Optin {
    /// Pass-through parameter set on the plugin
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

/// Message received by the page, or an echo of one it sent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub is_echo: bool,
    #[serde(default)]
    pub app_id: Option<i64>,
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default)]
    pub quick_reply: Option<QuickReplyPayload>,
}

/// Payload returned when a user taps a quick reply button
#[derive(Debug, Clone, Deserialize)]
pub struct QuickReplyPayload {
    pub payload: String,
}

/// Attachment sent by the user (image, audio, file, location, ...)
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Delivery receipt for messages the page sent
#[derive(Debug, Clone, Deserialize)]
pub struct Delivery {
    #[serde(default)]
    pub mids: Vec<String>,
    #[serde(default)]
    pub watermark: i64,
}

/// Postback button tap
#[derive(Debug, Clone, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Option<String>,
}

/// Read receipt: all messages up to `watermark` were read
#[derive(Debug, Clone, Deserialize)]
pub struct Read {
    #[serde(default)]
    pub watermark: i64,
}

/// Account link / unlink event
#[derive(Debug, Clone, Deserialize)]
pub struct AccountLinking {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub authorization_code: Option<String>,
}

// =============================================================================
// Send API Types (to the platform)
// =============================================================================

/// Typing indicator toggle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    TypingOn,
    TypingOff,
}

/// Quick reply button definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickReply {
    pub content_type: String,
    pub title: String,
    pub payload: String,
}

impl QuickReply {
    pub fn text(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Message body of a send request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_replies: Option<Vec<QuickReply>>,
}

/// Send API request: a message or a sender action addressed to one recipient
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SendRequest {
    pub recipient: Participant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<OutboundMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_action: Option<SenderAction>,
}

impl SendRequest {
    /// Plain text message
    pub fn text(recipient_id: &str, text: impl Into<String>) -> Self {
        Self {
            recipient: Participant {
                id: recipient_id.to_string(),
            },
            message: Some(OutboundMessage {
                text: text.into(),
                quick_replies: None,
            }),
            sender_action: None,
        }
    }

    /// Text message with quick reply buttons
    pub fn quick_replies(
        recipient_id: &str,
        text: impl Into<String>,
        quick_replies: Vec<QuickReply>,
    ) -> Self {
        Self {
            recipient: Participant {
                id: recipient_id.to_string(),
            },
            message: Some(OutboundMessage {
                text: text.into(),
                quick_replies: Some(quick_replies),
            }),
            sender_action: None,
        }
    }

    /// Typing indicator signal
    pub fn sender_action(recipient_id: &str, action: SenderAction) -> Self {
        Self {
            recipient: Participant {
                id: recipient_id.to_string(),
            },
            message: None,
            sender_action: Some(action),
        }
    }
}

/// Successful send API response
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}

// =============================================================================
// Search API Types
// =============================================================================

/// Search endpoint response; only `items` is consumed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Option<Vec<SearchItem>>,
}

/// A single search hit
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_message_event() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "object": "page",
            "entry": [{
                "id": "PAGE_ID",
                "time": 1458692752478i64,
                "messaging": [{
                    "sender": {"id": "USER_ID"},
                    "recipient": {"id": "PAGE_ID"},
                    "timestamp": 1458692752478i64,
                    "message": {
                        "mid": "mid.1457764197618:41d102a3e1ae206a38",
                        "text": "hello, world!",
                        "quick_reply": {"payload": "https://example.com"}
                    }
                }]
            }]
        }))
        .unwrap();

        assert_eq!(payload.object, "page");
        let (events, skipped) = payload.events();
        assert!(skipped.is_empty());
        let event = &events[0];
        assert_eq!(event.sender.id, "USER_ID");
        assert!(event.received_at().is_some());
        let message = event.message.as_ref().unwrap();
        assert!(!message.is_echo);
        assert_eq!(message.text.as_deref(), Some("hello, world!"));
        assert_eq!(
            message.quick_reply.as_ref().map(|q| q.payload.as_str()),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_malformed_event_does_not_sink_batch() {
        let payload: WebhookPayload = serde_json::from_value(json!({
            "object": "page",
            "entry": [
                {
                    "id": "PAGE",
                    "time": 1,
                    "messaging": [
                        {"sender": {"id": "U1"}, "recipient": {"id": "PAGE"}, "message": {"mid": "m", "text": "hi"}},
                        {"sender": {"id": "U1"}, "recipient": {"id": "PAGE"}, "read": {}},
                        {"recipient": {"id": "PAGE"}, "message": {"text": "no sender"}},
                        "not an object"
                    ]
                },
                {"messaging": [{"sender": {"id": "U2"}, "recipient": {"id": "PAGE"}, "postback": {"payload": "P"}}]},
                42
            ]
        }))
        .unwrap();

        let (events, skipped) = payload.events();
        let senders: Vec<&str> = events.iter().map(|e| e.sender.id.as_str()).collect();
        assert_eq!(senders, vec!["U1", "U1", "U2"]);
        assert_eq!(events[0].message.as_ref().unwrap().text.as_deref(), Some("hi"));
        assert_eq!(events[1].read.as_ref().unwrap().watermark, 0);
        assert_eq!(skipped.len(), 3);
    }

    #[test]
    fn test_parse_attachment_and_optin() {
        let event: MessagingEvent = serde_json::from_value(json!({
            "sender": {"id": "U"},
            "recipient": {"id": "P"},
            "message": {"attachments": [{"type": "image", "payload": {"url": "x"}}]}
        }))
        .unwrap();
        let attachments = event.message.unwrap().attachments.unwrap();
        assert_eq!(attachments[0].kind, "image");

        let event: MessagingEvent = serde_json::from_value(json!({
            "sender": {"id": "U"},
            "recipient": {"id": "P"},
            "timestamp": 1,
            "optin": {"ref": "PASS_THROUGH"}
        }))
        .unwrap();
        assert_eq!(
            event.optin.unwrap().reference.as_deref(),
            Some("PASS_THROUGH")
        );
    }

    #[test]
    fn test_send_request_shapes() {
        let typing = SendRequest::sender_action("U", SenderAction::TypingOn);
        assert_eq!(
            serde_json::to_value(&typing).unwrap(),
            json!({"recipient": {"id": "U"}, "sender_action": "typing_on"})
        );
        assert_eq!(
            serde_json::to_value(SenderAction::TypingOff).unwrap(),
            json!("typing_off")
        );
        assert!(serde_json::from_value::<SenderAction>(json!("mark_seen")).is_err());

        let text = SendRequest::text("U", "hi");
        assert_eq!(
            serde_json::to_value(&text).unwrap(),
            json!({"recipient": {"id": "U"}, "message": {"text": "hi"}})
        );

        let quick = SendRequest::quick_replies("U", "pick", vec![QuickReply::text("1", "L1")]);
        assert_eq!(
            serde_json::to_value(&quick).unwrap(),
            json!({
                "recipient": {"id": "U"},
                "message": {
                    "text": "pick",
                    "quick_replies": [{"content_type": "text", "title": "1", "payload": "L1"}]
                }
            })
        );
    }

    #[test]
    fn test_search_response_null_items() {
        let resp: SearchResponse = serde_json::from_str(r#"{"items":null}"#).unwrap();
        assert!(resp.items.is_none());
        let resp: SearchResponse = serde_json::from_str(r#"{"kind":"customsearch"}"#).unwrap();
        assert!(resp.items.is_none());
    }
}
