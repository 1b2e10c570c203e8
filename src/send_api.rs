//! Send API client for the Messenger platform
//!
//! Handles:
//! - Text messages
//! - Quick reply messages (search results)
//! - Sender actions (typing indicator)
//!
//! Every helper is fire-and-forget: failures are logged, never returned.

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::types::{QuickReply, SendRequest, SendResponse, SenderAction};

// =============================================================================
// Platform Limits
// =============================================================================

/// Default send endpoint
pub const DEFAULT_SEND_URL: &str = "https://graph.facebook.com/v2.6/me/messages";

/// Maximum characters in one text message
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Maximum quick reply buttons on one message
pub const MAX_QUICK_REPLIES: usize = 10;

/// Cut `text` to the platform message limit
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
/// May cut mid-word.
pub fn truncate_message(text: &str) -> String {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

// =============================================================================
// Send API Client
// =============================================================================

/// Send API client authenticated with the page access token
#[derive(Clone)]
pub struct SendApiClient {
    send_url: String,
    page_access_token: String,
    http_client: Client,
}

impl SendApiClient {
    pub fn new(http_client: Client, send_url: String, page_access_token: String) -> Self {
        Self {
            send_url,
            page_access_token,
            http_client,
        }
    }

    /// Send a plain text message
    pub async fn send_text(&self, recipient_id: &str, text: &str) {
        let request = SendRequest::text(recipient_id, truncate_message(text));
        self.send(&request).await;
    }

    /// Send a text message with quick reply buttons
    pub async fn send_quick_replies(
        &self,
        recipient_id: &str,
        text: &str,
        quick_replies: Vec<QuickReply>,
    ) {
        let request = SendRequest::quick_replies(recipient_id, truncate_message(text), quick_replies);
        self.send(&request).await;
    }

    /// Turn the typing indicator on or off
    pub async fn send_sender_action(&self, recipient_id: &str, action: SenderAction) {
        let request = SendRequest::sender_action(recipient_id, action);
        self.send(&request).await;
    }

    /// Deliver a request, logging the outcome
    pub async fn send(&self, request: &SendRequest) {
        match self.call_send_api(request).await {
            Ok(response) => match (&response.message_id, &response.recipient_id) {
                (Some(message_id), Some(recipient_id)) => {
                    info!(
                        "Sent message {} to recipient {}",
                        message_id, recipient_id
                    );
                }
                _ => {
                    debug!(
                        "Send API call succeeded for recipient {}",
                        request.recipient.id
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed calling Send API for recipient {}: {:#}",
                    request.recipient.id, e
                );
            }
        }
    }

    async fn call_send_api(&self, request: &SendRequest) -> Result<SendResponse> {
        let response = self
            .http_client
            .post(&self.send_url)
            .query(&[("access_token", self.page_access_token.as_str())])
            .json(request)
            .send()
            .await
            .context("Failed to send Send API request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Send API returned {}: {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse Send API response")
    }
}

// =============================================================================
// Tests
// =============================================================================
