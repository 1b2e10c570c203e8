//! Search API client
//!
//! Queries the configured search endpoint and shapes the hits into a single
//! reply: numbered title/snippet pairs plus one quick reply button per link.

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::send_api::{MAX_QUICK_REPLIES, truncate_message};
use crate::types::{QuickReply, SearchItem, SearchResponse};

/// Search failure
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search endpoint returned {0}")]
    Status(StatusCode),

    #[error("search response is not valid JSON: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Formatted search hits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    /// Reply text, at most one message long
    pub text: String,
    /// Result links, index-aligned with the numbered entries in `text`
    pub links: Vec<String>,
}

impl SearchResults {
    /// One button per link, labelled with its result number
    ///
    /// Hits without a link get no button; the remaining labels still match
    /// the numbering in `text`.
    pub fn quick_replies(&self) -> Vec<QuickReply> {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| !link.is_empty())
            .take(MAX_QUICK_REPLIES)
            .map(|(i, link)| QuickReply::text((i + 1).to_string(), link.clone()))
            .collect()
    }
}

/// Result of a completed search call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Results(SearchResults),
    /// No items: nothing matched or the daily quota is used up
    NoResults,
}

/// Format hits as `"{n}. {title}\n\n{snippet}"`, separated by blank lines
///
/// The text is cut to the message limit; `links` keeps every hit.
pub fn format_results(items: &[SearchItem]) -> SearchResults {
    let mut text = String::new();
    let mut links = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            text.push_str("\n\n");
        }
        text.push_str(&format!("{}. {}\n\n{}", i + 1, item.title, item.snippet));
        links.push(item.link.clone());
    }

    SearchResults {
        text: truncate_message(&text),
        links,
    }
}

/// Interpret a raw search response body
pub fn parse_response(body: &str) -> Result<SearchOutcome, SearchError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    match response.items {
        Some(items) if !items.is_empty() => Ok(SearchOutcome::Results(format_results(&items))),
        _ => Ok(SearchOutcome::NoResults),
    }
}

/// Client for the configured search endpoint
#[derive(Clone)]
pub struct SearchClient {
    base_url: String,
    http_client: Client,
}

impl SearchClient {
    pub fn new(http_client: Client, base_url: String) -> Self {
        Self {
            base_url,
            http_client,
        }
    }

    /// Request URL: the configured base followed by the query as typed
    pub fn query_url(&self, query: &str) -> String {
        format!("{}{}", self.base_url, query)
    }

    /// Run a search for `query`
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let url = self.query_url(query);
        debug!("Searching: {}", url);

        let response = self.http_client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Self::error_outcome(query, status, &response.text().await.unwrap_or_default());
        }

        let body = response.text().await?;
        let outcome = parse_response(&body)?;

        match &outcome {
            SearchOutcome::Results(results) => {
                info!("🔎 Search for {:?} returned {} results", query, results.links.len())
            }
            SearchOutcome::NoResults => info!("🔎 Search for {:?} returned no results", query),
        }

        Ok(outcome)
    }

    /// A quota rejection (403/429 with a JSON error body and no items) is
    /// reported like an empty search; any other failure status is an error.
    fn error_outcome(
        query: &str,
        status: StatusCode,
        body: &str,
    ) -> Result<SearchOutcome, SearchError> {
        let quota_status = matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS);
        if quota_status && let Ok(SearchOutcome::NoResults) = parse_response(body) {
            warn!("🔎 Search for {:?} rejected with {} (quota exhausted?)", query, status);
            return Ok(SearchOutcome::NoResults);
        }

        Err(SearchError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::send_api::MAX_MESSAGE_CHARS;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(title: &str, snippet: &str, link: &str) -> SearchItem {
        SearchItem {
            title: title.to_string(),
            snippet: snippet.to_string(),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_format_two_results() {
        let outcome = parse_response(
            r#"{"items":[{"title":"A","snippet":"B","link":"L1"},{"title":"C","snippet":"D","link":"L2"}]}"#,
        )
        .unwrap();

        let SearchOutcome::Results(results) = outcome else {
            panic!("expected results");
        };
        assert_eq!(results.text, "1. A\n\nB\n\n2. C\n\nD");
        assert_eq!(results.links, vec!["L1".to_string(), "L2".to_string()]);
    }

    #[test]
    fn test_long_results_truncated_to_first_2000_chars() {
        // 5 items of 500-char snippets: well over the message limit
        let items: Vec<SearchItem> = (0..5)
            .map(|i| item(&format!("T{}", i), &"x".repeat(500), &format!("L{}", i)))
            .collect();

        let mut untruncated = String::new();
        for (i, it) in items.iter().enumerate() {
            if i > 0 {
                untruncated.push_str("\n\n");
            }
            untruncated.push_str(&format!("{}. {}\n\n{}", i + 1, it.title, it.snippet));
        }
        assert!(untruncated.chars().count() >= 2500);

        let results = format_results(&items);
        assert_eq!(results.text.chars().count(), MAX_MESSAGE_CHARS);
        assert_eq!(
            results.text,
            untruncated.chars().take(MAX_MESSAGE_CHARS).collect::<String>()
        );
        assert_eq!(results.links.len(), 5);
    }

    #[test]
    fn test_empty_and_null_items() {
        assert_eq!(parse_response(r#"{"items":[]}"#).unwrap(), SearchOutcome::NoResults);
        assert_eq!(parse_response(r#"{"items":null}"#).unwrap(), SearchOutcome::NoResults);
        assert_eq!(parse_response("{}").unwrap(), SearchOutcome::NoResults);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_response("<html>quota</html>"),
            Err(SearchError::InvalidBody(_))
        ));
    }

    #[test]
    fn test_quick_replies_follow_link_count() {
        let three = format_results(&[item("a", "b", "L1"), item("c", "d", "L2"), item("e", "f", "L3")]);
        let replies = three.quick_replies();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0], QuickReply::text("1", "L1"));
        assert_eq!(replies[2], QuickReply::text("3", "L3"));

        let many: Vec<SearchItem> = (0..12).map(|i| item("t", "s", &format!("L{}", i))).collect();
        let replies = format_results(&many).quick_replies();
        assert_eq!(replies.len(), MAX_QUICK_REPLIES);
        assert_eq!(replies[9].title, "10");
        assert_eq!(replies[9].payload, "L9");
    }

    #[test]
    fn test_hit_without_link_gets_no_button() {
        let results = parse_response(
            r#"{"items":[{"title":"a","snippet":"b","link":"L1"},{"title":"c","snippet":"d"},{"title":"e","snippet":"f","link":"L3"}]}"#,
        )
        .unwrap();
        let SearchOutcome::Results(results) = results else {
            panic!("expected results");
        };
        assert!(results.text.contains("2. c"));

        let replies = results.quick_replies();
        assert_eq!(
            replies,
            vec![QuickReply::text("1", "L1"), QuickReply::text("3", "L3")]
        );
        assert!(replies.iter().all(|r| !r.payload.is_empty()));
    }

    #[tokio::test]
    async fn test_search_appends_raw_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("q", "rust lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"items":[{"title":"Rust","snippet":"A language","link":"https://rust-lang.org"}]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::new(
            Client::new(),
            format!("{}/customsearch/v1?key=k&q=", server.uri()),
        );
        assert!(client.query_url("rust lang").ends_with("&q=rust lang"));

        let outcome = client.search("rust lang").await.unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Results(SearchResults {
                text: "1. Rust\n\nA language".to_string(),
                links: vec!["https://rust-lang.org".to_string()],
            })
        );
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = SearchClient::new(Client::new(), format!("{}/s?q=", server.uri()));
        assert!(matches!(
            client.search("x").await,
            Err(SearchError::Status(StatusCode::FORBIDDEN))
        ));
    }

    #[tokio::test]
    async fn test_quota_rejection_is_no_results() {
        let quota_body = r#"{"error":{"code":429,"message":"Quota exceeded for quota metric 'Queries'"}}"#;

        for status in [403, 429] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_string(quota_body))
                .mount(&server)
                .await;

            let client = SearchClient::new(Client::new(), format!("{}/s?q=", server.uri()));
            assert_eq!(client.search("x").await.unwrap(), SearchOutcome::NoResults);
        }

        // Same body on a server error is still a failure
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string(quota_body))
            .mount(&server)
            .await;
        let client = SearchClient::new(Client::new(), format!("{}/s?q=", server.uri()));
        assert!(matches!(
            client.search("x").await,
            Err(SearchError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
    }
}
