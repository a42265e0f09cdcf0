//! HTML dashboard: metrics, current blocklist, and the last 10 audit
//! events newest-first. Content contract grounded in the original Go
//! `dashboard.go` template, since spec.md leaves rendering unspecified.

use crate::audit::AuditEvent;
use crate::context::Context;
use axum::extract::State;
use axum::response::Html;
use html_escape::encode_text;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;

const RECENT_LOG_COUNT: usize = 10;

pub async fn dashboard(State(ctx): State<Arc<Context>>) -> Html<String> {
    let snapshot = ctx.metrics.snapshot();
    let blocked_ips = ctx.blocklist.snapshot().await;
    let recent_logs = read_last_logs(&ctx.audit_log_path, RECENT_LOG_COUNT).await;

    let blocklist_html = if blocked_ips.is_empty() {
        "<li>No IPs currently blocked.</li>".to_string()
    } else {
        blocked_ips
            .iter()
            .map(|ip| format!("<li><strong>{}</strong></li>", encode_text(ip)))
            .collect::<Vec<_>>()
            .join("\n                ")
    };

    let logs_html = if recent_logs.is_empty() {
        "<tr><td colspan=\"6\" style=\"text-align: center;\">No security events recorded.</td></tr>".to_string()
    } else {
        recent_logs
            .iter()
            .map(|event| {
                format!(
                    "<tr>\n                    <td>{}</td>\n                    <td><code>{}</code></td>\n                    <td>{}</td>\n                    <td>{}</td>\n                    <td class=\"violation\">{}</td>\n                    <td>{}</td>\n                </tr>",
                    encode_text(&event.timestamp),
                    encode_text(&event.request_id),
                    encode_text(&event.location),
                    encode_text(&event.source_ip),
                    encode_text(&event.violation_type),
                    encode_text(&event.path),
                )
            })
            .collect::<Vec<_>>()
            .join("\n                ")
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>API Sentinel Dashboard</title>
    <style>
        body {{ font-family: 'Courier New', Courier, monospace; background: #f0f0f0; color: #000; padding: 2rem; }}
        h1 {{ border-bottom: 5px solid #000; padding-bottom: 0.5rem; display: inline-block; }}
        .grid {{ display: grid; grid-template-columns: 1fr 1fr; gap: 2rem; margin-top: 2rem; }}
        .card {{ border: 4px solid #000; background: #fff; padding: 1.5rem; box-shadow: 10px 10px 0px #000; }}
        .card.danger {{ border-color: #ff0000; box-shadow: 10px 10px 0px #ff0000; }}
        h2 {{ border-bottom: 2px solid #000; margin-top: 0; }}
        table {{ width: 100%; border-collapse: collapse; margin-top: 1rem; }}
        th, td {{ border: 2px solid #000; padding: 0.5rem; text-align: left; }}
        th {{ background: #000; color: #fff; }}
        .stat-value {{ font-size: 3rem; font-weight: bold; }}
        .violation {{ color: #ff0000; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>API SENTINEL: SYSTEM STATUS</h1>

    <div class="grid">
        <div class="card">
            <h2>METRICS</h2>
            <div>TOTAL REQUESTS: <span class="stat-value">{total_requests}</span></div>
            <div style="color: #ff0000;">BLOCKED ATTACKS: <span class="stat-value">{blocked_requests}</span></div>
        </div>

        <div class="card">
            <h2>CURRENT BLOCKLIST</h2>
            <ul>
                {blocklist_html}
            </ul>
        </div>
    </div>

    <div class="card danger" style="margin-top: 3rem;">
        <h2>RECENT SECURITY AUDIT LOGS</h2>
        <table>
            <thead>
                <tr>
                    <th>TIMESTAMP</th>
                    <th>REQUEST ID</th>
                    <th>LOCATION</th>
                    <th>SOURCE IP</th>
                    <th>VIOLATION</th>
                    <th>PATH</th>
                </tr>
            </thead>
            <tbody>
                {logs_html}
            </tbody>
        </table>
    </div>

    <div style="margin-top: 2rem; font-size: 0.8rem;">
        API SENTINEL v{version} | STATUS: RUNNING
    </div>
</body>
</html>
"#,
        total_requests = snapshot.total_requests,
        blocked_requests = snapshot.blocked_requests,
        version = ctx.version,
    ))
}

/// Reads the audit log and returns the last `count` events, newest first.
/// A missing or unreadable file yields an empty list rather than an error --
/// the dashboard degrades gracefully.
async fn read_last_logs(path: &str, count: usize) -> Vec<AuditEvent> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(_) => return Vec::new(),
    };

    let reader = tokio::io::BufReader::new(file);
    let mut lines = reader.lines();
    let mut all = Vec::new();
    while let Ok(Some(line)) = lines.next_line().await {
        if let Ok(event) = serde_json::from_str::<AuditEvent>(&line) {
            all.push(event);
        }
    }

    all.into_iter().rev().take(count).collect()
}
