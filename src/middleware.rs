use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};
use std::{net::SocketAddr, num::NonZeroU32, sync::Arc};
use tower_http::cors::CorsLayer;

use crate::state::AppState;

pub type IpRateLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// Build a keyed per-IP limiter with the given per-minute quota.
///
/// There are only two route groups and each owns one limiter: the admin
/// surface gets a strict quota, the webhook a generous one because the
/// transport batches deliveries aggressively.
pub fn ip_limiter(per_minute: u32) -> IpRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute.max(1)).unwrap());
    Arc::new(RateLimiter::keyed(quota))
}

/// Reject requests whose client IP exhausted the limiter's quota.
pub async fn ip_rate_limit(
    limiter: IpRateLimiter,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if limiter.check_key(&client_ip).is_ok() {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(%client_ip, "rate limit exceeded");
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Static-credential gate for the admin surface: the `x-admin-key` header is
/// compared in constant time against the configured key.
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = request
        .headers()
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if constant_time_eq(presented.as_bytes(), state.config.admin_key.as_bytes()) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("admin request with bad credential rejected");
        Err(StatusCode::UNAUTHORIZED)
    }
}

/// Length-checked constant-time byte comparison; the scan never exits early
/// on a mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// CORS for the operator dashboard, the only browser client this service
/// has. The webhook and transport are server-to-server and never preflight.
/// With `ADMIN_DASHBOARD_ORIGIN` unset no origin is allowed at all.
pub fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-admin-key")]);

    match std::env::var("ADMIN_DASHBOARD_ORIGIN")
        .ok()
        .and_then(|origin| origin.parse::<HeaderValue>().ok())
    {
        Some(origin) => layer.allow_origin(origin),
        None => layer,
    }
}
