//! Outermost layer: increments `total_requests` before any other
//! middleware observes the request.

use crate::context::Context;
use axum::extract::Request;
use axum::response::Response;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use tower::{Layer, Service};

#[derive(Clone)]
pub struct MetricsLayer {
    ctx: Arc<Context>,
}

impl MetricsLayer {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner, ctx: self.ctx.clone() }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    ctx: Arc<Context>,
}

impl<S> Service<Request> for MetricsService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        self.ctx.metrics.incr_total();
        self.inner.call(req)
    }
}
