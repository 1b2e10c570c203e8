//! Messenger Search Relay - Main Entry Point
//!
//! Receives Messenger webhooks, answers text with web search results and
//! links with the linked page's text.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use messenger_search_relay::config::RelayConfig;
use messenger_search_relay::router::MessageRouter;
use messenger_search_relay::webhook::{self, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,messenger_search_relay=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Messenger Search Relay starting...");

    // Load configuration; refuse to start without credentials and endpoints
    let config = RelayConfig::from_env()?;
    info!("📋 Configuration loaded");
    info!("🔗 Webhook callback URL: {}", config.webhook_url());
    if config.allow_unsigned {
        tracing::warn!("⚠️ Unsigned webhook requests will be accepted");
    }

    let router = MessageRouter::from_config(&config)?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid LISTEN_ADDR: {}", config.listen_addr))?;

    let state = WebhookState {
        config: Arc::new(config),
        router: Arc::new(router),
    };

    webhook::run_server(addr, state, shutdown_signal()).await?;

    info!("✅ Messenger Search Relay stopped");
    Ok(())
}

/// Resolve on Ctrl-C
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("📢 Shutdown signal received"),
        Err(err) => tracing::error!("Unable to listen for shutdown signal: {}", err),
    }
}
