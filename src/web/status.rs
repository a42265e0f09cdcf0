//! `/health` and `/stats` control-plane handlers.

use crate::context::Context;
use axum::extract::State;
use axum::response::Json;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: String,
}

pub async fn health(State(ctx): State<Arc<Context>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        version: ctx.version.clone(),
    })
}

pub async fn stats(State(ctx): State<Arc<Context>>) -> Json<crate::metrics::MetricsSnapshot> {
    Json(ctx.metrics.snapshot())
}
