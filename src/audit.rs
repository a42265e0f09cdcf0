//! Structured security event logging: one JSON object per line, written
//! off the request hot path by a background task draining a bounded
//! queue, with drop-oldest-on-overflow (spec.md §9's open question).

use crate::geo::GeoResolver;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, Notify};

const QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub timestamp: String,
    pub request_id: String,
    pub source_ip: String,
    pub location: String,
    pub method: String,
    pub path: String,
    pub violation_type: String,
    pub details: String,
}

/// What a caller hands to `AuditLogger::log` -- the geo lookup happens
/// inside the background task, off the hot path.
pub struct PendingEvent {
    pub request_id: String,
    pub source_ip: String,
    pub method: String,
    pub path: String,
    pub violation_type: String,
    pub details: String,
}

pub struct AuditLogger {
    queue: Arc<StdMutex<VecDeque<PendingEvent>>>,
    notify: Arc<Notify>,
}

impl AuditLogger {
    /// Opens (creating if needed) the audit log file and spawns the
    /// background writer task. Returns an error only on file-open failure,
    /// which is fatal at startup per spec.md §6's exit codes.
    pub async fn open(path: &str, geo: Arc<GeoResolver>) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(Path::new(path))
            .await
            .map_err(|e| anyhow::anyhow!("failed to open audit log '{path}': {e}"))?;

        let queue = Arc::new(StdMutex::new(VecDeque::with_capacity(QUEUE_CAPACITY)));
        let notify = Arc::new(Notify::new());
        tokio::spawn(Self::run(file, queue.clone(), notify.clone(), geo));

        tracing::info!(path = %path, "audit logging initialized");
        Ok(Self { queue, notify })
    }

    /// Non-blocking: pushes the event onto a bounded ring buffer. If the
    /// queue is already at `QUEUE_CAPACITY`, the oldest pending entry is
    /// popped and discarded to make room -- a deterministic drop, not a
    /// background retry that would pin an unbounded number of tasks.
    pub fn log(&self, event: PendingEvent) {
        let mut queue = self.queue.lock().expect("audit queue mutex poisoned");
        if queue.len() >= QUEUE_CAPACITY {
            queue.pop_front();
            tracing::warn!("audit queue full, dropping oldest pending event");
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    async fn run(
        file: File,
        queue: Arc<StdMutex<VecDeque<PendingEvent>>>,
        notify: Arc<Notify>,
        geo: Arc<GeoResolver>,
    ) {
        let file = Mutex::new(file);
        loop {
            let pending = queue.lock().expect("audit queue mutex poisoned").pop_front();
            let Some(pending) = pending else {
                notify.notified().await;
                continue;
            };

            let location = geo.resolve(&pending.source_ip).await.to_string();
            let event = AuditEvent {
                timestamp: Utc::now().to_rfc3339(),
                request_id: pending.request_id,
                source_ip: pending.source_ip,
                location,
                method: pending.method,
                path: pending.path,
                violation_type: pending.violation_type,
                details: pending.details,
            };

            let line = match serde_json::to_string(&event) {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to serialize audit event");
                    continue;
                }
            };

            let mut guard = file.lock().await;
            if let Err(e) = guard.write_all(format!("{line}\n").as_bytes()).await {
                tracing::warn!(error = %e, "failed to write audit log line");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoInfo, GeoProvider, GeoResolver};
    use tokio::io::AsyncReadExt;

    struct LocalOnlyProvider;

    #[async_trait::async_trait]
    impl GeoProvider for LocalOnlyProvider {
        async fn lookup(&self, _ip: &str) -> anyhow::Result<GeoInfo> {
            anyhow::bail!("no network in tests")
        }
    }

    #[tokio::test]
    async fn writes_valid_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let geo = Arc::new(GeoResolver::new(Box::new(LocalOnlyProvider)));

        let logger = AuditLogger::open(path.to_str().unwrap(), geo).await.unwrap();
        logger.log(PendingEvent {
            request_id: "abc123".into(),
            source_ip: "127.0.0.1".into(),
            method: "GET".into(),
            path: "/".into(),
            violation_type: "IP Blocklist".into(),
            details: "blocked".into(),
        });

        // give the background task a chance to drain and write
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        let mut contents = String::new();
        File::open(&path)
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();

        let line = contents.lines().next().expect("one line written");
        let parsed: AuditEvent = serde_json::from_str(line).expect("valid json");
        let reserialized = serde_json::to_string(&parsed).unwrap();
        let reparsed: AuditEvent = serde_json::from_str(&reserialized).unwrap();
        assert_eq!(parsed, reparsed);
        assert_eq!(parsed.violation_type, "IP Blocklist");
        assert_eq!(parsed.location, "Local, Dev Machine (Internal)");
    }
}
