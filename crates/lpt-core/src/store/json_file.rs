use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{apply_local_plan, plan_local_apply, LocalStore};
use crate::error::{Error, Result};
use crate::models::Snapshot;
use crate::sync::ChangeSummary;

/// Snapshot kept as one pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot wholesale.
    pub async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(snapshot)?;
        // Write beside the target and rename so a crash never leaves half a file.
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, serialized).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for JsonFileStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No local data file yet");
                return Ok(Snapshot::default());
            }
            Err(error) => return Err(error.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Snapshot::default());
        }
        serde_json::from_str(&raw).map_err(|error| {
            Error::InvalidInput(format!(
                "failed to parse local data at {}: {error}",
                self.path.display()
            ))
        })
    }

    async fn apply_merged_snapshot(&self, merged: &Snapshot) -> Result<ChangeSummary> {
        let current = self.load_snapshot().await?;
        let plan = plan_local_apply(&current, merged);
        let applied = apply_local_plan(&current, &plan, merged);
        self.save_snapshot(&applied).await?;

        let summary = plan.summary();
        tracing::info!(
            situations = %summary.situations,
            opportunities = %summary.opportunities,
            events = %summary.events,
            "Applied merged data locally"
        );
        Ok(summary)
    }
}
