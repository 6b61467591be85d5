//! Run history
//!
//! Appends one JSON object per line to `<state dir>/docfold/history.log`:
//! `{"timestamp", "run_id", "event", "data"}`. Writing history never fails
//! a build; IO errors are logged and dropped.

use crate::config::{schema::Config, ConfigManager};
use crate::error::DocfoldError;
use crate::pipeline::PipelineReport;
use crate::version::Resolution;
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;
use uuid::Uuid;

pub const BUILD_COMPLETED: &str = "build.completed";
pub const BUILD_FAILED: &str = "build.failed";
pub const STALE_FALLBACK: &str = "version.stale_fallback";

/// History writer for one invocation
pub struct RunHistory {
    enabled: bool,
    path: PathBuf,
    run_id: Uuid,
}

impl RunHistory {
    pub fn new(config: &Config) -> Self {
        Self::at(ConfigManager::history_path(), config.general.history)
    }

    pub fn at(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            path: path.into(),
            run_id: Uuid::new_v4(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that resolution reused stale cached metadata
    pub async fn stale_fallback(&self, resolution: &Resolution) {
        self.record(
            STALE_FALLBACK,
            json!({
                "tag": resolution.version.tag,
                "last_update": resolution.version.last_update.to_string(),
                "tag_origin": format!("{:?}", resolution.tag_origin),
                "date_origin": format!("{:?}", resolution.date_origin),
            }),
        )
        .await;
    }

    /// Record a finished build
    pub async fn build_completed(&self, report: &PipelineReport) {
        let merged_sha256 = match tokio::fs::read(&report.paths.merged).await {
            Ok(bytes) => Some(hex::encode(Sha256::digest(&bytes))),
            Err(_) => None,
        };

        self.record(
            BUILD_COMPLETED,
            json!({
                "identifier": report.identifier.as_str(),
                "fetch": report.fetch.as_str(),
                "merge": report.merge.as_str(),
                "render": report.render.as_str(),
                "output": report.output().display().to_string(),
                "merged_sha256": merged_sha256,
            }),
        )
        .await;
    }

    pub async fn build_failed(&self, error: &DocfoldError) {
        self.record(BUILD_FAILED, json!({ "error": error.to_string(), "remote": error.is_remote() }))
            .await;
    }

    /// Append one event line
    pub async fn record(&self, event: &str, data: serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "run_id": self.run_id.to_string(),
            "event": event,
            "data": data,
        });
        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize history event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write run history {}: {}", self.path.display(), e);
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }
}
