// Webhook surface: the transport calls us here with inbound player events.
//
// The HTTP layer verifies the shared secret, ACKs inside the transport's
// timeout, and defers all domain work to the dispatcher on a detached task.

pub mod dispatcher;
pub mod envelope;

pub use dispatcher::{Intent, WebhookDispatcher, classify};
pub use envelope::WebhookEnvelope;

use std::collections::HashMap;

use axum::extract::{Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{Next, from_fn};
use axum::routing::get;
use axum::{Json, Router};

use crate::middleware::{constant_time_eq, ip_limiter, ip_rate_limit};
use crate::state::AppState;

/// Per-IP quota on the webhook endpoint; the transport batches deliveries
/// aggressively, so this sits far above the admin quota.
const WEBHOOK_RATE_PER_MINUTE: u32 = 3_000;

pub fn create_webhook_routes(state: AppState) -> Router {
    let limiter = ip_limiter(WEBHOOK_RATE_PER_MINUTE);
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .layer(from_fn(move |request: Request, next: Next| {
            let limiter = limiter.clone();
            async move { ip_rate_limit(limiter, request, next).await }
        }))
        .with_state(state)
}

/// Transport verification handshake: echo the challenge iff the verify token
/// matches the shared secret.
async fn verify(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<String, StatusCode> {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params.get("hub.challenge");

    if mode == Some("subscribe")
        && token.is_some_and(|t| {
            constant_time_eq(t.as_bytes(), state.config.webhook_secret.as_bytes())
        })
    {
        Ok(challenge.cloned().unwrap_or_default())
    } else {
        tracing::warn!("webhook verification failed");
        Err(StatusCode::FORBIDDEN)
    }
}

/// Inbound event delivery. Parsing and secret comparison happen inline; the
/// domain handling is spawned so the transport always gets its ACK in time.
async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(envelope): Json<WebhookEnvelope>,
) -> Result<&'static str, StatusCode> {
    let presented = headers
        .get("x-webhook-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !constant_time_eq(presented.as_bytes(), state.config.webhook_secret.as_bytes()) {
        tracing::warn!("webhook delivery with bad secret rejected");
        return Err(StatusCode::FORBIDDEN);
    }

    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        dispatcher.dispatch(envelope).await;
    });

    Ok("EVENT_RECEIVED")
}
