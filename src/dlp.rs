//! Response-side Data Loss Prevention: buffers the full upstream response,
//! scans it for leak signatures, and replaces it on a match.
//!
//! The "deferred-commit buffer" from spec.md §4.5/§9 is realized as the
//! `DlpOutcome` enum below rather than a hand-rolled `ResponseWriter`
//! wrapper -- axum/hyper have no such trait, so buffering the whole body
//! with `axum::body::to_bytes` and deciding once is the natural fit.

use crate::audit::PendingEvent;
use crate::context::Context;
use crate::error::SentinelError;
use crate::security::patterns::{credit_card_pattern, ssn_pattern, Pattern};
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};

enum DlpOutcome {
    Clean(Response),
    Violation { pattern_name: &'static str },
}

struct DlpPatterns {
    patterns: Vec<Pattern>,
}

impl DlpPatterns {
    fn new() -> Self {
        Self {
            patterns: vec![credit_card_pattern(), ssn_pattern()],
        }
    }

    fn first_match(&self, body: &[u8]) -> Option<&'static str> {
        let text = String::from_utf8_lossy(body);
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(&text))
            .map(|p| p.name)
    }
}

#[derive(Clone)]
pub struct DlpLayer {
    patterns: Arc<DlpPatterns>,
    ctx: Arc<Context>,
}

impl DlpLayer {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            patterns: Arc::new(DlpPatterns::new()),
            ctx,
        }
    }
}

impl<S> Layer<S> for DlpLayer {
    type Service = DlpService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DlpService {
            inner,
            patterns: self.patterns.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

#[derive(Clone)]
pub struct DlpService<S> {
    inner: S,
    patterns: Arc<DlpPatterns>,
    ctx: Arc<Context>,
}

impl<S> Service<Request> for DlpService<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    S::Error: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let patterns = self.patterns.clone();
        let ctx = self.ctx.clone();
        let mut inner = self.inner.clone();

        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let source_ip = req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|c| c.0.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        Box::pin(async move {
            let response = inner.call(req).await?;

            let outcome = buffer_and_scan(response, &patterns, ctx.max_response_bytes).await;

            Ok(match outcome {
                DlpOutcome::Clean(response) => response,
                DlpOutcome::Violation { pattern_name } => {
                    ctx.metrics.incr_blocked();
                    ctx.audit.log(PendingEvent {
                        request_id,
                        source_ip,
                        method,
                        path,
                        violation_type: format!("DLP Violation: {pattern_name}"),
                        details: "Backend attempted to leak sensitive data".to_string(),
                    });
                    dlp_blocked_response()
                }
            })
        })
    }
}

async fn buffer_and_scan(response: Response, patterns: &DlpPatterns, max_bytes: usize) -> DlpOutcome {
    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, max_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to buffer upstream response for dlp scan");
            return DlpOutcome::Clean(
                SentinelError::BadGateway(format!("failed to buffer upstream response: {e}")).into_response(),
            );
        }
    };

    if let Some(pattern_name) = patterns.first_match(&bytes) {
        return DlpOutcome::Violation { pattern_name };
    }

    DlpOutcome::Clean(Response::from_parts(parts, Body::from(bytes)))
}

fn dlp_blocked_response() -> Response {
    let mut response = SentinelError::DlpBlocked(
        "Security Error: Data Loss Prevention policy triggered. Response blocked.".to_string(),
    )
    .into_response();

    let headers = response.headers_mut();
    headers.remove(header::CONTENT_LENGTH);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert("x-sentinel-dlp", HeaderValue::from_static("Blocked"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_credit_card_in_response_body() {
        let patterns = DlpPatterns::new();
        let body = b"Oops! Here is a credit card: 4111-1111-1111-1111";
        assert_eq!(patterns.first_match(body), Some("Credit Card Leak"));
    }

    #[test]
    fn detects_ssn_in_response_body() {
        let patterns = DlpPatterns::new();
        let body = b"ssn on file: 123-45-6789";
        assert_eq!(patterns.first_match(body), Some("SSN Leak"));
    }

    #[test]
    fn clean_body_has_no_match() {
        let patterns = DlpPatterns::new();
        assert_eq!(patterns.first_match(b"hello, world"), None);
    }
}
