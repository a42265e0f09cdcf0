pub mod audit;
pub mod blocklist;
pub mod cli;
pub mod config;
pub mod context;
pub mod dlp;
pub mod error;
pub mod geo;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod rate_limit;
pub mod security;
pub mod utils;
pub mod web;

use cli::Args;
use context::Context;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Builds the application's shared `Context` and axum `Router` from a
/// loaded `Config`, spawning the background tasks (health checkers, rate
/// limit reset) bound to `cancel`. Exposed separately from `run` so
/// integration tests can construct a fully-wired app without binding a
/// socket.
pub async fn build_app(
    config: &config::Config,
    cancel: CancellationToken,
) -> anyhow::Result<axum::Router> {
    let geo = Arc::new(geo::GeoResolver::with_http_provider());
    let audit = audit::AuditLogger::open(&config.server.audit_log, geo).await?;

    let http_client = reqwest::Client::builder()
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build upstream http client: {e}"))?;

    let mut routes = Vec::new();
    for route in &config.routes {
        let targets = route.resolved_targets()?;
        let balancer = Arc::new(proxy::LoadBalancer::new(&targets, http_client.clone())?);
        balancer.spawn_health_check(cancel.clone());
        routes.push((route.path.clone(), balancer));
    }
    let router = proxy::Router::new(routes);

    let ctx = Arc::new(Context::new(config, audit, router));
    ctx.rate_limiter.spawn_reset_task(cancel.clone());

    Ok(web::build_router(
        ctx,
        config.security.enable_xss,
        config.security.enable_sqli,
    ))
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let config = config::Config::load(&args.config)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        routes = config.routes.len(),
        "starting api sentinel"
    );

    let cancel = CancellationToken::new();
    let app = build_app(&config, cancel.clone()).await?;
    let app = app.into_make_service_with_connect_info::<std::net::SocketAddr>();

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind listener on {addr}: {e}"))?;
    info!(addr = %addr, "listening");

    let drain_secs = config.server.shutdown_timeout_secs;
    let shutdown_cancel = cancel.clone();
    let serve_fut =
        axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_cancel, drain_secs));

    // Bound the graceful drain: once the signal has fired, force a return
    // even if connections are still in flight.
    let force_after_signal = async {
        cancel.cancelled().await;
        tokio::time::sleep(std::time::Duration::from_secs(drain_secs)).await;
    };

    tokio::select! {
        res = serve_fut => { res.map_err(|e| anyhow::anyhow!("server error: {e}"))?; }
        _ = force_after_signal => {
            tracing::warn!("drain timeout exceeded, forcing shutdown");
        }
    }

    cancel.cancel();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken, drain_secs: u64) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!(drain_secs, "shutdown signal received, draining");
    cancel.cancel();
}
