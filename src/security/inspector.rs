//! Structured query/body scanning for XSS and SQLi signatures.
//!
//! Implemented as a `tower::Layer`/`Service` pair, the same shape as the
//! teacher's `RateLimitLayer`/`SecurityHeadersLayer`.

use super::patterns::Pattern;
use crate::audit::PendingEvent;
use crate::context::Context;
use crate::error::SentinelError;
use axum::body::Body;
use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};

pub struct SecurityInspector {
    patterns: Vec<Pattern>,
}

impl SecurityInspector {
    pub fn new(enable_xss: bool, enable_sqli: bool) -> Self {
        let mut patterns = Vec::new();
        if enable_xss {
            patterns.push(super::patterns::xss_pattern());
        }
        if enable_sqli {
            patterns.push(super::patterns::sqli_pattern());
        }
        Self { patterns }
    }

    /// Decode `data` once (lenient fallback to the original on invalid
    /// UTF-8) and return the first matching pattern's name, if any.
    fn first_match(&self, data: &str) -> Option<&'static str> {
        if data.is_empty() {
            return None;
        }
        let decoded = percent_decode_str(data).decode_utf8_lossy();
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(&decoded))
            .map(|p| p.name)
    }

    /// Recursively walk a JSON value, matching every string encountered.
    fn scan_json(&self, value: &Value) -> Option<&'static str> {
        match value {
            Value::String(s) => self.first_match(s),
            Value::Array(items) => items.iter().find_map(|v| self.scan_json(v)),
            Value::Object(map) => map.iter().find_map(|(key, v)| {
                self.first_match(key).or_else(|| self.scan_json(v))
            }),
            _ => None,
        }
    }

    fn scan_body(&self, content_type: &str, body: &[u8]) -> Option<&'static str> {
        if content_type.starts_with("application/json") {
            match serde_json::from_slice::<Value>(body) {
                Ok(value) => return self.scan_json(&value),
                Err(_) => {
                    let text = String::from_utf8_lossy(body);
                    return self.first_match(&text);
                }
            }
        }

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let text = String::from_utf8_lossy(body);
            let pairs: Vec<(String, String)> = url::form_urlencoded::parse(text.as_bytes())
                .into_owned()
                .collect();
            for (_, value) in &pairs {
                if let Some(name) = self.first_match(value) {
                    return Some(name);
                }
            }
            return None;
        }

        let text = String::from_utf8_lossy(body);
        self.first_match(&text)
    }
}

#[derive(Clone)]
pub struct InspectorLayer {
    inspector: Arc<SecurityInspector>,
    ctx: Arc<Context>,
}

impl InspectorLayer {
    pub fn new(inspector: SecurityInspector, ctx: Arc<Context>) -> Self {
        Self {
            inspector: Arc::new(inspector),
            ctx,
        }
    }
}

impl<S> Layer<S> for InspectorLayer {
    type Service = InspectorService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InspectorService {
            inner,
            inspector: self.inspector.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InspectorService<S> {
    inner: S,
    inspector: Arc<SecurityInspector>,
    ctx: Arc<Context>,
}

impl<S> Service<Request> for InspectorService<S>
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
        let inspector = self.inspector.clone();
        let ctx = self.ctx.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // 1. Query string, undecoded form, matched first.
            let raw_query = req.uri().query().unwrap_or("").to_string();
            if let Some(name) = inspector.first_match(&raw_query) {
                return Ok(block(&ctx, req.headers(), req.extensions(), req.method(), req.uri().path(), name, "Query").await);
            }

            let content_length = req
                .headers()
                .get(axum::http::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);

            if content_length == 0 {
                return inner.call(req).await;
            }

            let content_type = req
                .headers()
                .get(axum::http::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            let (parts, body) = req.into_parts();
            let bytes = match axum::body::to_bytes(body, ctx.max_body_bytes).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return Ok((StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response());
                }
            };

            if let Some(name) = inspector.scan_body(&content_type, &bytes) {
                return Ok(block(&ctx, &parts.headers, &parts.extensions, &parts.method, parts.uri.path(), name, "Body").await);
            }

            // Restore the body byte-for-byte for downstream handlers.
            let restored = Request::from_parts(parts, Body::from(bytes));
            inner.call(restored).await
        })
    }
}

async fn block(
    ctx: &Arc<Context>,
    headers: &axum::http::HeaderMap,
    extensions: &axum::http::Extensions,
    method: &axum::http::Method,
    path: &str,
    pattern_name: &'static str,
    source: &str,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let source_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|c| c.0.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    tracing::warn!(pattern = pattern_name, source = %source, "blocked malicious request");

    ctx.metrics.incr_blocked();
    ctx.audit.log(PendingEvent {
        request_id,
        source_ip,
        method: method.to_string(),
        path: path.to_string(),
        violation_type: pattern_name.to_string(),
        details: format!("Blocked in: {source}"),
    });

    let mut response = SentinelError::Forbidden("Malicious activity detected".to_string()).into_response();
    response
        .headers_mut()
        .insert(axum::http::header::CONTENT_TYPE, axum::http::HeaderValue::from_static("text/plain"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xss_in_query_blocks() {
        let inspector = SecurityInspector::new(true, true);
        assert_eq!(
            inspector.first_match("q=%3Cscript%3Ealert(1)%3C/script%3E"),
            Some("XSS Detection")
        );
    }

    #[test]
    fn sqli_in_form_value_blocks() {
        let inspector = SecurityInspector::new(true, true);
        let body = b"username=admin&comment=drop table users--";
        assert_eq!(
            inspector.scan_body("application/x-www-form-urlencoded", body),
            Some("SQL Injection Detection")
        );
    }

    #[test]
    fn nested_json_xss_blocks() {
        let inspector = SecurityInspector::new(true, true);
        let body = br#"{"user":{"name":"x","bio":"<script>alert(1)</script>"}}"#;
        assert_eq!(
            inspector.scan_body("application/json", body),
            Some("XSS Detection")
        );
    }

    #[test]
    fn malformed_json_falls_back_to_raw_scan() {
        let inspector = SecurityInspector::new(true, true);
        let body = b"{not valid json <script>alert(1)</script>";
        assert_eq!(
            inspector.scan_body("application/json", body),
            Some("XSS Detection")
        );
    }

    #[test]
    fn empty_input_never_matches() {
        let inspector = SecurityInspector::new(true, true);
        assert_eq!(inspector.first_match(""), None);
    }

    #[test]
    fn disabled_pattern_is_not_checked() {
        let inspector = SecurityInspector::new(false, true);
        assert_eq!(inspector.first_match("<script>alert(1)</script>"), None);
        assert_eq!(inspector.first_match("' or 1=1 --"), Some("SQL Injection Detection"));
    }
}
