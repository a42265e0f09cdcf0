//! Composes the axum `Router`, wiring the canonical middleware order from
//! the middleware composer (§4.1): metrics-increment, blocklist, DLP (if
//! enabled), inspector, rate-limiter, security-headers, terminal router.
//! Because tower layers nest outer-to-inner in application order, passing
//! the tuple to `.layer` in this order realizes that chain directly.

use crate::context::Context;
use crate::dlp::DlpLayer;
use crate::security::{InspectorLayer, SecurityInspector};
use crate::web::middleware::{
    BlocklistLayer, MetricsLayer, RateLimitLayer, RequestIdLayer, SecurityHeadersLayer,
};
use crate::web::{admin, dashboard, proxy_handler, status};
use axum::routing::{any, get};
use axum::Router;
use std::sync::Arc;

pub fn build_router(ctx: Arc<Context>, enable_xss: bool, enable_sqli: bool) -> Router {
    let inspector = SecurityInspector::new(enable_xss, enable_sqli);
    let inspector_layer = InspectorLayer::new(inspector, ctx.clone());
    let blocklist_layer = BlocklistLayer::new(ctx.clone());
    let rate_limit_layer = RateLimitLayer::new(ctx.clone());

    let proxy_router: Router<Arc<Context>> = if ctx.enable_dlp {
        let dlp_layer = DlpLayer::new(ctx.clone());
        Router::new().fallback(any(proxy_handler::handle)).layer((
            blocklist_layer,
            dlp_layer,
            inspector_layer,
            rate_limit_layer,
            // Innermost: decorates every eventual response, including one a
            // blocklist/DLP/inspector/rate-limit rejection produced.
            SecurityHeadersLayer,
        ))
    } else {
        Router::new().fallback(any(proxy_handler::handle)).layer((
            blocklist_layer,
            inspector_layer,
            rate_limit_layer,
            SecurityHeadersLayer,
        ))
    };

    let control_plane = Router::new()
        .route("/health", get(status::health))
        .route("/stats", get(status::stats))
        .route("/block", get(admin::block).post(admin::block))
        .route("/unblock", get(admin::unblock).post(admin::unblock))
        .route("/dashboard", get(dashboard::dashboard));

    let router = control_plane.merge(proxy_router).with_state(ctx.clone());

    router.layer((
        // Outermost: always-run accounting before anything else observes the request.
        MetricsLayer::new(ctx.clone()),
        RequestIdLayer,
    ))
}
