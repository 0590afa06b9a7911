use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Error status recorded for a batch artifact that holds an error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure {
    pub status: u16,
    pub recorded_at: DateTime<Utc>,
}

/// Sidecar file marking batch artifacts whose request came back with a
/// non-success status.
///
/// Lives outside the batch directory so the flattener never parses it as a
/// batch. An entry is cleared once the same artifact is fetched successfully.
#[derive(Debug)]
pub struct BatchStatusLog {
    path: PathBuf,
    failures: BTreeMap<String, BatchFailure>,
}

impl BatchStatusLog {
    /// Loads the log at `path`, starting empty when it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let failures = if path.exists() {
            fs::read_to_string(path)
                .ok()
                .and_then(|content| serde_json::from_str(&content).ok())
                .inspect(|_| debug!("Loaded batch status from: {}", path.display()))
                .unwrap_or_else(|| {
                    warn!(
                        "Failed to read batch status file {}, starting with empty status",
                        path.display()
                    );
                    BTreeMap::new()
                })
        } else {
            BTreeMap::new()
        };

        Self {
            path: path.to_path_buf(),
            failures,
        }
    }

    pub fn record_failure(&mut self, batch: &str, status: u16) {
        self.failures.insert(
            batch.to_string(),
            BatchFailure {
                status,
                recorded_at: Utc::now(),
            },
        );
    }

    /// Clears a previous failure for `batch`. Returns whether one existed.
    pub fn record_success(&mut self, batch: &str) -> bool {
        self.failures.remove(batch).is_some()
    }

    pub fn failures(&self) -> &BTreeMap<String, BatchFailure> {
        &self.failures
    }

    /// Persists the log. Nothing is written while no failure was ever seen.
    pub fn save(&self) -> Result<()> {
        if self.failures.is_empty() && !self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.failures)?;
        fs::write(&self.path, content)?;

        Ok(())
    }
}
