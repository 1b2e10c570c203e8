//! Message router - turns webhook events into search, fetch or help replies

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::fetch::PageFetcher;
use crate::search::{SearchClient, SearchOutcome};
use crate::send_api::SendApiClient;
use crate::types::{InboundMessage, MessagingEvent, SenderAction};

// =============================================================================
// Fixed Replies
// =============================================================================

pub const HELP_MESSAGE: &str = "I can only read text for now. Send me something to search \
for, or a link starting with http:// or https:// and I'll send you the page text.";

pub const NO_RESULTS_MESSAGE: &str = "Your search returned 0 results. The daily search quota \
has most likely been used up; please try again tomorrow.";

pub const SEARCH_ERROR_MESSAGE: &str =
    "Sorry, something went wrong while searching. Please try again later.";

pub const FETCH_ERROR_MESSAGE: &str =
    "Sorry, I couldn't load that page. Please check the link and try again.";

pub const EMPTY_PAGE_MESSAGE: &str = "That page doesn't contain any readable text.";

pub const OPTIN_MESSAGE: &str = "Authentication successful";

pub const POSTBACK_MESSAGE: &str = "Postback called";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Intent Classification
// =============================================================================

/// What an inbound message asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Copy of a message the page sent
    Echo,
    /// Fetch a page and reply with its text
    FetchPage(String),
    /// Run a web search
    Search(String),
    /// Attachments only; reply with help text
    Attachments,
    Unrecognized,
}

/// Pick the single branch a message takes
///
/// Priority: echo, quick reply payload, URL text, query text, attachments.
pub fn classify(message: &InboundMessage) -> Intent {
    if message.is_echo {
        return Intent::Echo;
    }

    if let Some(quick_reply) = &message.quick_reply {
        return Intent::FetchPage(quick_reply.payload.clone());
    }

    if let Some(text) = &message.text {
        if text.starts_with("http://") || text.starts_with("https://") {
            return Intent::FetchPage(text.clone());
        }
        return Intent::Search(text.clone());
    }

    if message.attachments.is_some() {
        return Intent::Attachments;
    }

    Intent::Unrecognized
}

// =============================================================================
// Router
// =============================================================================

/// Dispatches messaging events to the search and fetch clients
#[derive(Clone)]
pub struct MessageRouter {
    send_api: SendApiClient,
    search: SearchClient,
    fetcher: PageFetcher,
}

impl MessageRouter {
    pub fn new(send_api: SendApiClient, search: SearchClient, fetcher: PageFetcher) -> Self {
        Self {
            send_api,
            search,
            fetcher,
        }
    }

    /// Build the router and its shared HTTP client from configuration
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::new(
            SendApiClient::new(
                http_client.clone(),
                config.send_api_url.clone(),
                config.page_access_token.clone(),
            ),
            SearchClient::new(http_client.clone(), config.search_api_url.clone()),
            PageFetcher::new(http_client),
        ))
    }

    /// Handle one messaging event; never fails, errors become replies or logs
    pub async fn handle_event(&self, event: &MessagingEvent) {
        let sender_id = event.sender.id.as_str();
        let received_at = event
            .received_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "unknown time".to_string());

        if let Some(optin) = &event.optin {
            info!(
                "Received authentication for user {} and page {} with pass through param {:?} at {}",
                sender_id, event.recipient.id, optin.reference, received_at
            );
            self.send_api.send_text(sender_id, OPTIN_MESSAGE).await;
        } else if let Some(message) = &event.message {
            debug!(
                "Received message {:?} from user {} at {}",
                message.mid, sender_id, received_at
            );
            self.handle_message(sender_id, message).await;
        } else if let Some(delivery) = &event.delivery {
            for mid in &delivery.mids {
                debug!("Received delivery confirmation for message {}", mid);
            }
            debug!(
                "All messages before {} were delivered to {}",
                delivery.watermark, sender_id
            );
        } else if let Some(postback) = &event.postback {
            info!(
                "Received postback for user {} with payload {:?} at {}",
                sender_id, postback.payload, received_at
            );
            self.send_api.send_text(sender_id, POSTBACK_MESSAGE).await;
        } else if let Some(read) = &event.read {
            debug!(
                "Received read receipt from {}: messages before {} were read",
                sender_id, read.watermark
            );
        } else if let Some(linking) = &event.account_linking {
            info!(
                "Received account link event for user {} with status {} and auth code {:?}",
                sender_id, linking.status, linking.authorization_code
            );
        } else {
            warn!("Webhook received unknown messaging event from {}", sender_id);
        }
    }

    /// Route a message by its intent
    pub async fn handle_message(&self, sender_id: &str, message: &InboundMessage) {
        match classify(message) {
            Intent::Echo => {
                debug!(
                    "Received echo for message {:?} and app {:?} with metadata {:?}",
                    message.mid, message.app_id, message.metadata
                );
            }
            Intent::FetchPage(url) => self.fetch_page(sender_id, &url).await,
            Intent::Search(query) => self.run_search(sender_id, &query).await,
            Intent::Attachments => {
                self.send_api.send_text(sender_id, HELP_MESSAGE).await;
            }
            Intent::Unrecognized => {
                warn!("Ignoring message {:?} with no text or attachments", message.mid);
            }
        }
    }

    /// Search and reply, with the typing indicator on for the search call
    async fn run_search(&self, sender_id: &str, query: &str) {
        self.send_api
            .send_sender_action(sender_id, SenderAction::TypingOn)
            .await;

        let outcome = self.search.search(query).await;

        self.send_api
            .send_sender_action(sender_id, SenderAction::TypingOff)
            .await;

        match outcome {
            Ok(SearchOutcome::Results(results)) => {
                let quick_replies = results.quick_replies();
                self.send_api
                    .send_quick_replies(sender_id, &results.text, quick_replies)
                    .await;
            }
            Ok(SearchOutcome::NoResults) => {
                self.send_api.send_text(sender_id, NO_RESULTS_MESSAGE).await;
            }
            Err(e) => {
                error!("Search for {:?} failed: {}", query, e);
                self.send_api.send_text(sender_id, SEARCH_ERROR_MESSAGE).await;
            }
        }
    }

    /// Fetch a page and reply with its text
    async fn fetch_page(&self, sender_id: &str, url: &str) {
        match self.fetcher.fetch_text(url).await {
            Ok(text) if text.is_empty() => {
                self.send_api.send_text(sender_id, EMPTY_PAGE_MESSAGE).await;
            }
            Ok(text) => {
                self.send_api.send_text(sender_id, &text).await;
            }
            Err(e) => {
                error!("Fetching {} failed: {}", url, e);
                self.send_api.send_text(sender_id, FETCH_ERROR_MESSAGE).await;
            }
        }
    }
}
