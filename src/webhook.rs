//! Messenger webhook HTTP handlers

use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::RelayConfig;
use crate::crypto::{self, SIGNATURE_256_HEADER, SIGNATURE_HEADER, SignatureError};
use crate::router::MessageRouter;
use crate::types::{VerifyParams, WebhookPayload};

/// Webhook server state
#[derive(Clone)]
pub struct WebhookState {
    pub config: Arc<RelayConfig>,
    pub router: Arc<MessageRouter>,
}

/// Build the HTTP application
pub fn app(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(handle_webhook))
        .route("/health", get(health_check))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Run the webhook HTTP server until `shutdown` resolves
pub async fn run_server(
    addr: SocketAddr,
    state: WebhookState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Webhook server listening on {}", listener.local_addr()?);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Middleware to log all incoming HTTP requests
async fn log_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("🌐 HTTP {} {}", method, path);

    let response = next.run(req).await;

    info!("📤 {} {} -> {}", method, path, response.status());

    response
}

/// Webhook subscription handshake (GET request from the platform)
async fn verify(
    State(state): State<WebhookState>,
    Query(params): Query<VerifyParams>,
) -> Result<String, StatusCode> {
    match crypto::verify_subscription(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        &state.config.validation_token,
    ) {
        Some(challenge) => {
            info!("Validating webhook");
            Ok(challenge)
        }
        None => {
            warn!(
                "Failed validation: mode={:?}, make sure the validation tokens match",
                params.mode
            );
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Check the body signature; `Err` carries the rejection status
fn check_signature(state: &WebhookState, headers: &HeaderMap, body: &[u8]) -> Result<(), StatusCode> {
    let header = headers
        .get(SIGNATURE_256_HEADER)
        .or_else(|| headers.get(SIGNATURE_HEADER))
        .and_then(|v| v.to_str().ok());

    match crypto::verify_signature(&state.config.app_secret, body, header) {
        Ok(method) => {
            debug!("Signature verified ({})", method.as_str());
            Ok(())
        }
        Err(SignatureError::Missing) if state.config.allow_unsigned => {
            warn!("Couldn't validate the signature: header missing, accepting unsigned request");
            Ok(())
        }
        Err(e) => {
            warn!("Rejecting webhook request: {}", e);
            Err(StatusCode::FORBIDDEN)
        }
    }
}

/// Handle webhook events (POST request from the platform)
///
/// Events are handled on spawned tasks; the platform gets its 200 right away
/// and never sees downstream failures.
async fn handle_webhook(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    debug!("Request body length: {} bytes", body.len());

    if let Err(status) = check_signature(&state, &headers, &body) {
        return status;
    }

    if state.config.debug_mode {
        debug!("Raw webhook body: {}", String::from_utf8_lossy(&body));
    }

    let body: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            error!("Webhook body is not JSON: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let object = body.get("object").and_then(serde_json::Value::as_str);
    if object != Some("page") {
        warn!("Ignoring webhook for object type {:?}", object);
        return StatusCode::NOT_FOUND;
    }

    let payload = WebhookPayload::deserialize(&body).unwrap_or_else(|e| {
        warn!("Page webhook has no usable entries: {}", e);
        WebhookPayload::default()
    });

    let (events, skipped) = payload.events();
    for skip in &skipped {
        warn!("Skipping unrecognized messaging event {}: {}", skip.raw, skip.error);
    }
    debug!(
        "Dispatching {} events from {} entries",
        events.len(),
        payload.entry.len()
    );

    for event in events {
        let router = state.router.clone();
        tokio::spawn(async move {
            router.handle_event(&event).await;
        });
    }

    StatusCode::OK
}
