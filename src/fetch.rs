//! Page fetch client: GET an arbitrary URL and reduce it to plain text

use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::sanitize::html_to_text;

/// Page fetch failure
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("page request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("page returned {0}")]
    Status(StatusCode),
}

#[derive(Clone)]
pub struct PageFetcher {
    http_client: Client,
}

impl PageFetcher {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    /// Fetch `url` and return its text content with all markup removed
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("Fetching page {}", url);

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/html, text/plain;q=0.9, */*;q=0.5")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let text = html_to_text(&body);
        info!(
            "📄 Fetched {} ({} bytes of HTML, {} chars of text)",
            url,
            body.len(),
            text.chars().count()
        );

        Ok(text)
    }
}
