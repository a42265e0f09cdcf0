//! Admission filter over the shared IP blocklist.

use crate::audit::PendingEvent;
use crate::blocklist::strip_port;
use crate::context::Context;
use crate::error::SentinelError;
use axum::extract::{ConnectInfo, Request};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};

#[derive(Clone)]
pub struct BlocklistLayer {
    ctx: Arc<Context>,
}

impl BlocklistLayer {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

impl<S> Layer<S> for BlocklistLayer {
    type Service = BlocklistService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BlocklistService { inner, ctx: self.ctx.clone() }
    }
}

#[derive(Clone)]
pub struct BlocklistService<S> {
    inner: S,
    ctx: Arc<Context>,
}

impl<S> Service<Request> for BlocklistService<S>
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
        let ctx = self.ctx.clone();
        let mut inner = self.inner.clone();

        let remote_addr = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|c| c.0.to_string())
            .unwrap_or_default();
        let source_ip = strip_port(&remote_addr);
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        Box::pin(async move {
            if ctx.blocklist.contains(&source_ip).await {
                ctx.metrics.incr_blocked();
                ctx.audit.log(PendingEvent {
                    request_id,
                    source_ip,
                    method,
                    path,
                    violation_type: "IP Blocklist".to_string(),
                    details: "Blocked by IP blocklist".to_string(),
                });
                return Ok(SentinelError::Forbidden("Your IP is blacklisted".to_string()).into_response());
            }

            inner.call(req).await
        })
    }
}
