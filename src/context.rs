//! Shared application state, threaded through every middleware and handler
//! via `Arc<Context>` instead of process-wide singletons.

use crate::audit::AuditLogger;
use crate::blocklist::Blocklist;
use crate::config::Config;
use crate::metrics::Metrics;
use crate::proxy::Router;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;

pub struct Context {
    pub metrics: Metrics,
    pub audit: AuditLogger,
    pub blocklist: Blocklist,
    pub rate_limiter: Arc<RateLimiter>,
    pub router: Router,
    pub admin_key: String,
    pub max_body_bytes: usize,
    pub max_response_bytes: usize,
    pub enable_dlp: bool,
    pub audit_log_path: String,
    pub version: String,
}

impl Context {
    pub fn new(config: &Config, audit: AuditLogger, router: Router) -> Self {
        Self {
            metrics: Metrics::new(),
            audit,
            blocklist: Blocklist::new(),
            rate_limiter: RateLimiter::new(config.server.rate_limit),
            router,
            admin_key: config.server.admin_key.clone(),
            max_body_bytes: config.server.max_body_bytes,
            max_response_bytes: config.server.max_response_bytes,
            enable_dlp: config.security.enable_dlp,
            audit_log_path: config.server.audit_log.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
