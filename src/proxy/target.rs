//! A single backend endpoint with a liveness flag toggled by health checks.

use std::sync::atomic::{AtomicBool, Ordering};
use url::Url;

pub struct Target {
    pub url: Url,
    alive: AtomicBool,
}

impl Target {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            alive: AtomicBool::new(true),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }

    /// `host:port` suitable for a TCP dial, defaulting the port from the
    /// URL scheme when unspecified.
    pub fn dial_addr(&self) -> Option<String> {
        let host = self.url.host_str()?;
        let port = self
            .url
            .port_or_known_default()
            .unwrap_or(if self.url.scheme() == "https" { 443 } else { 80 });
        Some(format!("{host}:{port}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dial_addr_defaults_port_from_scheme() {
        let target = Target::new(Url::parse("http://example.com").unwrap());
        assert_eq!(target.dial_addr(), Some("example.com:80".to_string()));

        let target = Target::new(Url::parse("https://example.com").unwrap());
        assert_eq!(target.dial_addr(), Some("example.com:443".to_string()));

        let target = Target::new(Url::parse("http://example.com:9000").unwrap());
        assert_eq!(target.dial_addr(), Some("example.com:9000".to_string()));
    }

    #[test]
    fn starts_alive() {
        let target = Target::new(Url::parse("http://example.com").unwrap());
        assert!(target.is_alive());
    }
}
