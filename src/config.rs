//! YAML configuration loading, generalized from the teacher's `figment`
//! setup (TOML + env) to YAML + env per the spec.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Yaml};
use figment::value::UncasedStr;
use figment::Figment;
use serde::{Deserialize, Serialize};

fn default_port() -> u16 {
    8080
}

fn default_rate_limit() -> u32 {
    10
}

fn default_audit_log() -> String {
    "audit.log".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_dlp_action() -> String {
    "block".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub admin_key: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    #[serde(default = "default_audit_log")]
    pub audit_log: String,
    /// Maximum in-memory buffer for a request body or a buffered upstream
    /// response body. Not in the original spec's config keys, but spec.md
    /// §5 calls for a configurable limit; exposed here with a sane default.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default = "default_max_body_bytes")]
    pub max_response_bytes: usize,
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_shutdown_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    pub path: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub targets: Option<Vec<String>>,
}

impl RouteConfig {
    /// `targets` wins over `target` if both are set; a lone `target` is
    /// promoted to a singleton list.
    pub fn resolved_targets(&self) -> Result<Vec<String>> {
        if let Some(targets) = &self.targets {
            if !targets.is_empty() {
                return Ok(targets.clone());
            }
        }
        if let Some(target) = &self.target {
            return Ok(vec![target.clone()]);
        }
        anyhow::bail!("route '{}' has neither `target` nor `targets`", self.path)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub enable_xss: bool,
    #[serde(default)]
    pub enable_sqli: bool,
    #[serde(default)]
    pub enable_dlp: bool,
    #[serde(default = "default_dlp_action")]
    pub dlp_action: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_xss: false,
            enable_sqli: false,
            enable_dlp: false,
            dlp_action: default_dlp_action(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl Config {
    /// Load configuration from a YAML file, with `SENTINEL_*` environment
    /// overrides layered on top (env wins over file, matching spec.md §6).
    pub fn load(path: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            anyhow::bail!("config file not found: {path}");
        }

        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("SENTINEL_").map(|key| {
                if key == UncasedStr::new("PORT") {
                    "server.port".into()
                } else if key == UncasedStr::new("ADMIN_KEY") {
                    "server.admin_key".into()
                } else if key == UncasedStr::new("RATE_LIMIT") {
                    "server.rate_limit".into()
                } else if key == UncasedStr::new("AUDIT_LOG") {
                    "server.audit_log".into()
                } else if key == UncasedStr::new("DLP_ACTION") {
                    "security.dlp_action".into()
                } else {
                    key.into()
                }
            }))
            .extract()
            .context("failed to load configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.security.dlp_action != "block" && self.security.dlp_action != "mask" {
            anyhow::bail!(
                "security.dlp_action must be 'block' or 'mask', got '{}'",
                self.security.dlp_action
            );
        }
        if self.security.dlp_action == "mask" {
            anyhow::bail!(
                "security.dlp_action 'mask' is declared but not implemented; use 'block'"
            );
        }
        for route in &self.routes {
            route.resolved_targets().with_context(|| {
                format!("invalid route configuration for path '{}'", route.path)
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_when_keys_missing() {
        let file = write_config(
            r#"
server:
  admin_key: "secret"
routes:
  - path: "/"
    target: "http://localhost:9000"
"#,
        );
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.rate_limit, 10);
        assert_eq!(config.server.audit_log, "audit.log");
    }

    #[test]
    fn targets_wins_over_target() {
        let file = write_config(
            r#"
server:
  admin_key: "secret"
routes:
  - path: "/"
    target: "http://localhost:9000"
    targets:
      - "http://localhost:9001"
      - "http://localhost:9002"
"#,
        );
        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        let targets = config.routes[0].resolved_targets().unwrap();
        assert_eq!(
            targets,
            vec!["http://localhost:9001".to_string(), "http://localhost:9002".to_string()]
        );
    }

    #[test]
    fn mask_dlp_action_rejected() {
        let file = write_config(
            r#"
server:
  admin_key: "secret"
security:
  dlp_action: "mask"
routes:
  - path: "/"
    target: "http://localhost:9000"
"#,
        );
        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn missing_file_is_fatal() {
        assert!(Config::load("/nonexistent/path/config.yaml").is_err());
    }
}
