//! Logging setup, mirroring the teacher's pretty/JSON subscriber toggle.

use crate::cli::LogFormat;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Configure and install the global `tracing` subscriber.
pub fn setup_logging(log_format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,sentinel=info"));

    let subscriber: Box<dyn tracing::Subscriber + Send + Sync> = match log_format {
        LogFormat::Pretty => Box::new(
            FmtSubscriber::builder()
                .with_target(true)
                .with_env_filter(filter)
                .finish(),
        ),
        LogFormat::Json => Box::new(
            FmtSubscriber::builder()
                .with_target(true)
                .json()
                .with_env_filter(filter)
                .finish(),
        ),
    };

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}
