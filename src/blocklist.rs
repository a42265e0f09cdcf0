//! IP blocklist: a filter plus two admin-guarded mutation handlers.

use std::collections::HashSet;
use tokio::sync::RwLock;

pub struct Blocklist {
    ips: RwLock<HashSet<String>>,
}

impl Blocklist {
    pub fn new() -> Self {
        Self {
            ips: RwLock::new(HashSet::new()),
        }
    }

    pub async fn contains(&self, ip: &str) -> bool {
        self.ips.read().await.contains(ip)
    }

    pub async fn block(&self, ip: &str) {
        self.ips.write().await.insert(ip.to_string());
    }

    pub async fn unblock(&self, ip: &str) {
        self.ips.write().await.remove(ip);
    }

    /// Snapshot for the dashboard.
    pub async fn snapshot(&self) -> Vec<String> {
        self.ips.read().await.iter().cloned().collect()
    }
}

impl Default for Blocklist {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the source IP from a socket address string, stripping the port.
/// Falls back to the raw string on parse failure, matching
/// `net.SplitHostPort`'s fallback in the original Go middleware.
pub fn strip_port(remote_addr: &str) -> String {
    match remote_addr.parse::<std::net::SocketAddr>() {
        Ok(addr) => addr.ip().to_string(),
        Err(_) => remote_addr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn block_and_unblock_round_trip() {
        let blocklist = Blocklist::new();
        assert!(!blocklist.contains("1.2.3.4").await);

        blocklist.block("1.2.3.4").await;
        assert!(blocklist.contains("1.2.3.4").await);

        blocklist.unblock("1.2.3.4").await;
        assert!(!blocklist.contains("1.2.3.4").await);
    }

    #[test]
    fn strip_port_handles_ipv4_and_ipv6() {
        assert_eq!(strip_port("1.2.3.4:5678"), "1.2.3.4");
        assert_eq!(strip_port("[::1]:5678"), "::1");
        assert_eq!(strip_port("not-an-addr"), "not-an-addr");
    }
}
