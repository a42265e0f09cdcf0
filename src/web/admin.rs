//! Blocklist admin endpoints, guarded by a shared-secret query parameter.

use crate::context::Context;
use crate::error::SentinelError;
use axum::extract::{Query, State};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct AdminParams {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    key: String,
}

fn check_admin(ctx: &Context, params: &AdminParams) -> Result<(), SentinelError> {
    if params.key.is_empty() || params.key != ctx.admin_key {
        return Err(SentinelError::Unauthorized);
    }
    if params.ip.is_empty() {
        return Err(SentinelError::BadRequest("missing 'ip' parameter".to_string()));
    }
    Ok(())
}

pub async fn block(
    State(ctx): State<Arc<Context>>,
    Query(params): Query<AdminParams>,
) -> Result<&'static str, SentinelError> {
    check_admin(&ctx, &params)?;
    ctx.blocklist.block(&params.ip).await;
    tracing::info!(ip = %params.ip, "ip blocked via admin endpoint");
    Ok("IP Blocked")
}

pub async fn unblock(
    State(ctx): State<Arc<Context>>,
    Query(params): Query<AdminParams>,
) -> Result<&'static str, SentinelError> {
    check_admin(&ctx, &params)?;
    ctx.blocklist.unblock(&params.ip).await;
    tracing::info!(ip = %params.ip, "ip unblocked via admin endpoint");
    Ok("IP Unblocked")
}
