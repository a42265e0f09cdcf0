//! Terminal handler for all paths not claimed by a control-plane route:
//! resolves the longest-matching route and forwards through its load
//! balancer.

use crate::context::Context;
use crate::error::SentinelError;
use crate::utils::log_if_slow;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLOW_UPSTREAM_THRESHOLD: Duration = Duration::from_secs(1);

pub async fn handle(State(ctx): State<Arc<Context>>, req: Request) -> Result<Response, SentinelError> {
    let path = req.uri().path().to_string();
    let Some(balancer) = ctx.router.resolve(&path) else {
        return Err(SentinelError::NotFound);
    };

    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let method = req.method().clone();
    let headers = req.headers().clone();

    // Mirrors the inspector's own overflow handling: a body that can't be
    // buffered within the configured limit is rejected outright rather than
    // silently forwarded as something other than what the client sent.
    let body = match axum::body::to_bytes(req.into_body(), ctx.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return Ok((StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response());
        }
    };

    let start = Instant::now();
    let response = balancer.forward(method, &path_and_query, headers, body).await;
    log_if_slow(start, SLOW_UPSTREAM_THRESHOLD, "proxy_forward");

    Ok(response)
}
