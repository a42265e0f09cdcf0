//! Command-line arguments, parsed once at startup.

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// API Sentinel -- security-enforcing reverse proxy.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Path to the YAML configuration file.
    #[clap(long, default_value = "config.yaml")]
    pub config: String,

    /// Log output format.
    #[clap(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}
