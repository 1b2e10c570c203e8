//! Messenger Search Relay Library
//!
//! A webhook relay that answers Messenger page conversations with web search
//! results and plain-text renderings of linked pages.
//!
//! # Architecture
//!
//! ```text
//! Messenger ──HTTPS──▶ Webhook (this) ──▶ Router ──┬──▶ Search API
//!     ▲                  │ signature gate          └──▶ Page fetch
//!     └─────── Send API ◀┴────────── reply ◀─────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! export MESSENGER_APP_SECRET=your_app_secret
//! export MESSENGER_VALIDATION_TOKEN=your_verify_token
//! export MESSENGER_PAGE_ACCESS_TOKEN=your_page_token
//! export SERVER_URL=https://relay.example.com
//! export SEARCH_API_URL='https://www.googleapis.com/customsearch/v1?key=KEY&cx=CX&q='
//!
//! messenger-search-relay
//! ```
//!
//! Any of these may instead be set in `config/default.json`
//! (`appSecret`, `validationToken`, `pageAccessToken`, `serverURL`, `searchURL`).

pub mod config;
pub mod crypto;
pub mod fetch;
pub mod router;
pub mod sanitize;
pub mod search;
pub mod send_api;
pub mod types;
pub mod webhook;

pub use config::RelayConfig;
pub use router::MessageRouter;
pub use search::SearchClient;
pub use send_api::SendApiClient;
pub use types::*;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::RelayConfig;
    pub use crate::fetch::PageFetcher;
    pub use crate::router::{Intent, MessageRouter, classify};
    pub use crate::search::{SearchClient, SearchOutcome, SearchResults};
    pub use crate::send_api::SendApiClient;
    pub use crate::types::*;
}
