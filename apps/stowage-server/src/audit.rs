//! Append-only audit trail of user actions.
//!
//! Each recorded action becomes one JSON line in a per-day file named
//! `app_YYYY-MM-DD.log` under the configured directory. Write failures are
//! logged and swallowed.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Writes one JSON line per recorded action.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Create an audit log writing under `dir`. The directory is created on
    /// the first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Record a login.
    pub async fn login(&self, user: &str) {
        self.record("login", user, json!({"event": "user_login"}))
            .await;
    }

    /// Record a bucket creation.
    pub async fn bucket_created(&self, user: &str, bucket: &str, compartment_ocid: &str) {
        self.record(
            "create_bucket",
            user,
            json!({
                "bucket_name": bucket,
                "compartment_ocid": compartment_ocid,
            }),
        )
        .await;
    }

    /// Record a bucket deletion.
    pub async fn bucket_deleted(&self, user: &str, bucket: &str) {
        self.record("delete_bucket", user, json!({"bucket_name": bucket}))
            .await;
    }

    /// Append one entry to today's log file.
    async fn record(&self, action: &str, user: &str, details: serde_json::Value) {
        let now = Utc::now();
        let entry = json!({
            "timestamp": now.format("%Y-%m-%d %H:%M:%S").to_string(),
            "action": action,
            "user": user,
            "details": details,
        });
        let path = self.dir.join(format!("app_{}.log", now.format("%Y-%m-%d")));

        if let Err(error) = self.append(&path, &entry).await {
            warn!(%error, path = %path.display(), "Failed to write audit entry");
        }
    }

    async fn append(&self, path: &Path, entry: &serde_json::Value) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let mut line = entry.to_string();
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }
}
