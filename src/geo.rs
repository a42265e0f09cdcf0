//! IP geolocation: a pluggable provider behind an in-memory cache.
//!
//! Loopback and RFC1918 addresses are short-circuited to a synthetic
//! "local" record and never touch the provider or the cache -- mirrors
//! `examples/original_source/internal/logger/geo.go`.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    pub isp: String,
}

impl GeoInfo {
    fn local() -> Self {
        Self {
            country: "Local".to_string(),
            city: "Dev Machine".to_string(),
            isp: "Internal".to_string(),
        }
    }

    fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            isp: "Unknown".to_string(),
        }
    }
}

impl std::fmt::Display for GeoInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.country == "Unknown" {
            write!(f, "Unknown")
        } else {
            write!(f, "{}, {} ({})", self.city, self.country, self.isp)
        }
    }
}

/// Returns true for loopback and RFC1918 addresses, matching the Go
/// original's prefix checks (`127.0.0.1`, `::1`, `192.168.`, `10.`).
fn is_local(ip: &str) -> bool {
    ip == "127.0.0.1" || ip == "::1" || ip == "localhost" || ip.starts_with("192.168.") || ip.starts_with("10.")
}

/// Abstraction over the external lookup service, so the HTTP provider can
/// be swapped out in tests.
#[async_trait::async_trait]
pub trait GeoProvider: Send + Sync {
    async fn lookup(&self, ip: &str) -> anyhow::Result<GeoInfo>;
}

/// Hits `http://ip-api.com/json/{ip}` with a 3s timeout, the same endpoint
/// the original Go implementation uses.
pub struct HttpGeoProvider {
    client: reqwest::Client,
}

impl HttpGeoProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .expect("failed to build geo lookup http client");
        Self { client }
    }
}

impl Default for HttpGeoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl GeoProvider for HttpGeoProvider {
    async fn lookup(&self, ip: &str) -> anyhow::Result<GeoInfo> {
        #[derive(Deserialize)]
        struct ApiResponse {
            #[serde(default)]
            country: Option<String>,
            #[serde(default)]
            city: Option<String>,
            #[serde(default, rename = "isp")]
            isp: Option<String>,
        }

        let url = format!("http://ip-api.com/json/{ip}");
        let resp: ApiResponse = self.client.get(url).send().await?.json().await?;
        Ok(GeoInfo {
            country: resp.country.unwrap_or_else(|| "Unknown".to_string()),
            city: resp.city.unwrap_or_else(|| "Unknown".to_string()),
            isp: resp.isp.unwrap_or_else(|| "Unknown".to_string()),
        })
    }
}

/// Cache + provider, populated on first successful lookup, never evicted.
pub struct GeoResolver {
    provider: Box<dyn GeoProvider>,
    cache: DashMap<String, GeoInfo>,
}

impl GeoResolver {
    pub fn new(provider: Box<dyn GeoProvider>) -> Self {
        Self {
            provider,
            cache: DashMap::new(),
        }
    }

    pub fn with_http_provider() -> Self {
        Self::new(Box::new(HttpGeoProvider::new()))
    }

    /// Resolve a location for `ip`. Never fails -- returns `"Unknown"` on
    /// any lookup error, matching the spec's resolved-asynchronously
    /// contract.
    pub async fn resolve(&self, ip: &str) -> GeoInfo {
        if is_local(ip) {
            return GeoInfo::local();
        }

        if let Some(cached) = self.cache.get(ip) {
            return cached.clone();
        }

        match self.provider.lookup(ip).await {
            Ok(info) => {
                self.cache.insert(ip.to_string(), info.clone());
                info
            }
            Err(e) => {
                tracing::warn!(ip = %ip, error = %e, "geo lookup failed");
                GeoInfo::unknown()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProvider(GeoInfo);

    #[async_trait::async_trait]
    impl GeoProvider for FixedProvider {
        async fn lookup(&self, _ip: &str) -> anyhow::Result<GeoInfo> {
            Ok(self.0.clone())
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl GeoProvider for FailingProvider {
        async fn lookup(&self, _ip: &str) -> anyhow::Result<GeoInfo> {
            anyhow::bail!("simulated failure")
        }
    }

    #[tokio::test]
    async fn local_ips_short_circuit_without_caching() {
        let resolver = GeoResolver::new(Box::new(FailingProvider));
        let info = resolver.resolve("127.0.0.1").await;
        assert_eq!(info.country, "Local");
        assert!(resolver.cache.is_empty());
    }

    #[tokio::test]
    async fn successful_lookup_is_cached() {
        let info = GeoInfo {
            country: "US".into(),
            city: "Springfield".into(),
            isp: "Acme".into(),
        };
        let resolver = GeoResolver::new(Box::new(FixedProvider(info.clone())));
        let resolved = resolver.resolve("8.8.8.8").await;
        assert_eq!(resolved, info);
        assert_eq!(resolver.cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_lookup_returns_unknown() {
        let resolver = GeoResolver::new(Box::new(FailingProvider));
        let info = resolver.resolve("8.8.8.8").await;
        assert_eq!(info.country, "Unknown");
    }
}
