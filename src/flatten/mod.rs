mod export;
mod record;
mod schema;

pub use export::{write_dataset, ExportFormat};

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value;

use crate::artifacts::batch_start_offset;
use crate::error::{CollectorError, Result};
use record::{flatten, json_kind, BuildRecord, Row};

/// Rows and builds contributed by one batch artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub file: String,
    pub builds: usize,
    pub rows: usize,
}

/// Flattened rows from every batch artifact, in file order.
#[derive(Debug, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    sources: Vec<SourceSummary>,
}

impl Dataset {
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    fn push_rows(&mut self, rows: Vec<Row>) {
        self.rows.extend(rows);
    }
}

/// Flattens every batch artifact in `batch_dir` into one dataset.
///
/// Files are visited by the start offset encoded in their name (files that do
/// not follow the batch naming scheme come last, by name), so repeated loads
/// of an unchanged directory produce identical datasets.
///
/// # Errors
///
/// A file that is not valid JSON, or not an array of build objects, fails
/// the whole load with [`CollectorError::MalformedBatch`]. Nothing is skipped.
pub fn load(batch_dir: &Path) -> Result<Dataset> {
    let files = batch_files(batch_dir)?;
    info!(
        "Loading {} batch artifacts from {}",
        files.len(),
        batch_dir.display()
    );

    let mut dataset = Dataset::default();

    for path in files {
        let builds = parse_batch(&path)?;
        let before = dataset.rows.len();

        for build in &builds {
            dataset.push_rows(flatten(build));
        }

        let summary = SourceSummary {
            file: file_name(&path),
            builds: builds.len(),
            rows: dataset.rows.len() - before,
        };
        debug!(
            "{}: {} builds, {} rows",
            summary.file, summary.builds, summary.rows
        );
        dataset.sources.push(summary);
    }

    info!("Flattened {} rows", dataset.rows.len());

    Ok(dataset)
}

fn batch_files(batch_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(batch_dir)? {
        let path = entry?.path();
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| {
        let name = file_name(path);
        let offset = batch_start_offset(&name);
        (offset.is_none(), offset.unwrap_or_default(), name)
    });

    Ok(files)
}

fn parse_batch(path: &Path) -> Result<Vec<BuildRecord>> {
    let malformed = |reason: String| CollectorError::MalformedBatch {
        path: path.to_path_buf(),
        reason,
    };

    let content = fs::read(path)?;
    let value: Value = serde_json::from_slice(&content).map_err(|e| malformed(e.to_string()))?;

    let builds = match value {
        Value::Array(builds) => builds,
        other => {
            return Err(malformed(format!(
                "expected an array of builds, found {}",
                json_kind(&other)
            )))
        }
    };

    builds
        .into_iter()
        .enumerate()
        .map(|(index, build)| {
            BuildRecord::from_value(build).map_err(|reason| malformed(format!("build #{index}: {reason}")))
        })
        .collect()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
