//! Unconditionally applied response headers -- the outermost opinion on
//! every response, including those produced by inner filters.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::response::Response;
use std::task::{Context, Poll};
use tower::{Layer, Service};

static XCTO: HeaderValue = HeaderValue::from_static("nosniff");
static XFO: HeaderValue = HeaderValue::from_static("DENY");
static XXP: HeaderValue = HeaderValue::from_static("1; mode=block");
static CSP: HeaderValue = HeaderValue::from_static("default-src 'self'");

#[derive(Clone)]
pub struct SecurityHeadersLayer;

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersService { inner }
    }
}

#[derive(Clone)]
pub struct SecurityHeadersService<S> {
    inner: S,
}

impl<S> Service<Request> for SecurityHeadersService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let headers = response.headers_mut();

            headers.insert("x-content-type-options", XCTO.clone());
            headers.insert("x-frame-options", XFO.clone());
            headers.insert("x-xss-protection", XXP.clone());
            headers.insert("content-security-policy", CSP.clone());

            Ok(response)
        })
    }
}
