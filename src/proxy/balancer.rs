//! Round-robin load balancer over a fixed set of targets, with active TCP
//! health checking and request forwarding grounded in the teacher's
//! `web/proxy.rs::proxy_to_ssr`.

use super::target::Target;
use crate::error::SentinelError;
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use url::Url;

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(2);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

/// Hop-by-hop headers stripped from the upstream response before it is
/// forwarded to the client.
const STRIPPED_RESPONSE_HEADERS: &[HeaderName] =
    &[header::TRANSFER_ENCODING, header::CONNECTION, header::CONTENT_LENGTH];

pub struct LoadBalancer {
    targets: Vec<Arc<Target>>,
    cursor: AtomicU64,
    client: reqwest::Client,
}

impl LoadBalancer {
    pub fn new(urls: &[String], client: reqwest::Client) -> anyhow::Result<Self> {
        let targets = urls
            .iter()
            .map(|u| Url::parse(u).map(|url| Arc::new(Target::new(url))))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("invalid target url: {e}"))?;

        if targets.is_empty() {
            anyhow::bail!("a route must have at least one target");
        }

        Ok(Self {
            targets,
            cursor: AtomicU64::new(0),
            client,
        })
    }

    /// Snapshot the live targets, select the next one in round-robin order
    /// over the *original* index space (the cursor never resets to match
    /// the filtered healthy subset -- a faithfully-preserved quirk).
    fn pick(&self) -> Option<Arc<Target>> {
        let healthy: Vec<&Arc<Target>> = self.targets.iter().filter(|t| t.is_alive()).collect();
        if healthy.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) as usize % healthy.len();
        Some(healthy[idx].clone())
    }

    /// Forward `req` to the next healthy target, rewriting scheme/host to
    /// the target and preserving method/path/query/headers/body.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let Some(target) = self.pick() else {
            return SentinelError::ServiceUnavailable.into_response();
        };

        let url = match target.url.join(path_and_query) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "failed to build upstream url");
                return SentinelError::BadGateway(format!("failed to build upstream url: {e}")).into_response();
            }
        };

        let mut builder = self.client.request(method, url);
        for (name, value) in headers.iter() {
            if *name == header::HOST || *name == header::CONNECTION {
                continue;
            }
            builder = builder.header(name, value);
        }
        builder = builder.body(body);

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, "upstream request failed");
                return SentinelError::BadGateway(format!("upstream request failed: {e}")).into_response();
            }
        };

        let status = resp.status();
        let resp_headers = resp.headers().clone();
        let body = match resp.bytes().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read upstream response body");
                return SentinelError::BadGateway(format!("failed to read upstream response body: {e}"))
                    .into_response();
            }
        };

        let mut out_headers = HeaderMap::new();
        for (name, value) in resp_headers.iter() {
            if STRIPPED_RESPONSE_HEADERS.contains(name) {
                continue;
            }
            out_headers.insert(name.clone(), value.clone());
        }

        (
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            out_headers,
            body,
        )
            .into_response()
    }

    /// Spawns the active TCP health-check loop. Runs until `cancel` fires.
    pub fn spawn_health_check(self: &Arc<Self>, cancel: CancellationToken) {
        let balancer = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEALTH_CHECK_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("health checker shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        for target in &balancer.targets {
                            let Some(addr) = target.dial_addr() else {
                                target.set_alive(false);
                                continue;
                            };
                            let alive = tokio::time::timeout(
                                HEALTH_CHECK_TIMEOUT,
                                TcpStream::connect(&addr),
                            )
                            .await
                            .map(|r| r.is_ok())
                            .unwrap_or(false);

                            if alive != target.is_alive() {
                                tracing::info!(target = %addr, alive, "target liveness changed");
                            }
                            target.set_alive(alive);
                        }
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balancer(n: usize) -> LoadBalancer {
        let urls: Vec<String> = (0..n).map(|i| format!("http://host{i}.example:80")).collect();
        LoadBalancer::new(&urls, reqwest::Client::new()).unwrap()
    }

    #[test]
    fn round_robins_evenly_across_healthy_targets() {
        let lb = balancer(3);
        let mut counts = [0usize; 3];
        for _ in 0..9 {
            let picked = lb.pick().unwrap();
            let idx = lb
                .targets
                .iter()
                .position(|t| Arc::ptr_eq(t, &picked))
                .unwrap();
            counts[idx] += 1;
        }
        assert_eq!(counts, [3, 3, 3]);
    }

    #[test]
    fn skips_unhealthy_targets() {
        let lb = balancer(2);
        lb.targets[0].set_alive(false);
        for _ in 0..4 {
            let picked = lb.pick().unwrap();
            assert!(Arc::ptr_eq(&picked, &lb.targets[1]));
        }
    }

    #[test]
    fn no_healthy_targets_returns_none() {
        let lb = balancer(1);
        lb.targets[0].set_alive(false);
        assert!(lb.pick().is_none());
    }

    #[test]
    fn rejects_empty_target_list() {
        assert!(LoadBalancer::new(&[], reqwest::Client::new()).is_err());
    }
}
