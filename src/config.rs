//! Configuration management
//!
//! Every setting is read from an environment variable first and from a JSON
//! config file second (`RELAY_CONFIG`, default `config/default.json`).

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::send_api::DEFAULT_SEND_URL;

/// Default config file location
pub const DEFAULT_CONFIG_PATH: &str = "config/default.json";

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    // =========================================================================
    // Platform Credentials
    // =========================================================================
    /// App secret for webhook signature verification
    pub app_secret: String,

    /// Token the platform echoes back during webhook subscription
    pub validation_token: String,

    /// Page access token for the send API
    pub page_access_token: String,

    // =========================================================================
    // Endpoints
    // =========================================================================
    /// Public base URL of this server
    pub server_url: String,

    /// Search endpoint base; the query text is appended verbatim
    pub search_api_url: String,

    /// Send API endpoint
    #[serde(default = "default_send_api_url")]
    pub send_api_url: String,

    /// HTTP bind address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    // =========================================================================
    // Behaviour
    // =========================================================================
    /// Timeout for search, fetch and send calls
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,

    /// Accept webhook POSTs that carry no signature header
    #[serde(default)]
    pub allow_unsigned: bool,

    /// Log raw webhook bodies
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_send_api_url() -> String {
    DEFAULT_SEND_URL.to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

/// Config file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub app_secret: Option<String>,
    pub validation_token: Option<String>,
    pub page_access_token: Option<String>,
    #[serde(rename = "serverURL")]
    pub server_url: Option<String>,
    #[serde(rename = "searchURL")]
    pub search_url: Option<String>,
    #[serde(rename = "sendURL")]
    pub send_url: Option<String>,
    pub listen_addr: Option<String>,
    pub upstream_timeout_secs: Option<u64>,
    pub allow_unsigned: Option<bool>,
    pub debug_mode: Option<bool>,
}

impl ConfigFile {
    /// Read a config file; a missing file yields an empty config
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse config file {:?}", path))
    }
}

impl RelayConfig {
    /// Load configuration from environment variables and the config file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let path =
            std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = ConfigFile::load(Path::new(&path))?;

        Self::from_sources(|key| std::env::var(key).ok(), &file)
    }

    /// Resolve every setting from `env` first, then `file`
    pub fn from_sources<F>(env: F, file: &ConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str, fallback: &Option<String>| -> Result<String> {
            env(key)
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.clone())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} is required", key))
        };

        let flag = |key: &str, fallback: Option<bool>| -> bool {
            match env(key) {
                Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
                None => fallback.unwrap_or(false),
            }
        };

        let upstream_timeout_secs = match env("UPSTREAM_TIMEOUT_SECS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("UPSTREAM_TIMEOUT_SECS is not a number: {}", v))?,
            None => file
                .upstream_timeout_secs
                .unwrap_or_else(default_upstream_timeout),
        };

        Ok(Self {
            app_secret: required("MESSENGER_APP_SECRET", &file.app_secret)?,
            validation_token: required("MESSENGER_VALIDATION_TOKEN", &file.validation_token)?,
            page_access_token: required("MESSENGER_PAGE_ACCESS_TOKEN", &file.page_access_token)?,
            server_url: required("SERVER_URL", &file.server_url)?,
            search_api_url: required("SEARCH_API_URL", &file.search_url)?,
            send_api_url: env("SEND_API_URL")
                .or_else(|| file.send_url.clone())
                .unwrap_or_else(default_send_api_url),
            listen_addr: env("LISTEN_ADDR")
                .or_else(|| file.listen_addr.clone())
                .unwrap_or_else(default_listen_addr),
            upstream_timeout_secs,
            allow_unsigned: flag("ALLOW_UNSIGNED", file.allow_unsigned),
            debug_mode: flag("DEBUG_MODE", file.debug_mode),
        })
    }

    /// Public URL to register as the webhook callback
    pub fn webhook_url(&self) -> String {
        format!("{}/webhook", self.server_url.trim_end_matches('/'))
    }
}
