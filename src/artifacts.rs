use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::config::StorageConfig;
use crate::error::Result;
use crate::providers::Identifier;

const BATCH_PREFIX: &str = "builds_info_";
const BATCH_SUFFIX: &str = ".json";

/// Name of the batch artifact covering `[start, start + batch_size - 1]`.
///
/// Always uses the nominal batch size, so the final batch of a run may
/// claim more identifiers than it holds.
pub fn batch_file_name(start: usize, batch_size: usize) -> String {
    let end = (start + batch_size).saturating_sub(1);
    format!("{BATCH_PREFIX}{start}_{end}{BATCH_SUFFIX}")
}

/// Start offset encoded in a batch artifact name, if it follows the layout.
pub fn batch_start_offset(file_name: &str) -> Option<usize> {
    let range = file_name
        .strip_prefix(BATCH_PREFIX)?
        .strip_suffix(BATCH_SUFFIX)?;
    let (start, end) = range.split_once('_')?;
    end.parse::<usize>().ok()?;
    start.parse().ok()
}

/// Local layout shared by the fetch and flatten stages.
///
/// All paths are resolved against the configured data directory; absolute
/// paths in the configuration are used as-is.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    ids_file: PathBuf,
    batch_dir: PathBuf,
    status_file: PathBuf,
    output_file: PathBuf,
}

impl ArtifactStore {
    pub fn new(storage: &StorageConfig) -> Self {
        let root = &storage.data_dir;
        Self {
            ids_file: root.join(&storage.ids_file),
            batch_dir: root.join(&storage.batch_dir),
            status_file: root.join(&storage.status_file),
            output_file: root.join(&storage.output),
        }
    }

    pub fn ids_file(&self) -> &Path {
        &self.ids_file
    }

    pub fn batch_dir(&self) -> &Path {
        &self.batch_dir
    }

    pub fn status_file(&self) -> &Path {
        &self.status_file
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Replaces the identifier artifact with `identifiers`.
    pub fn write_identifiers(&self, identifiers: &[Identifier]) -> Result<()> {
        if let Some(parent) = self.ids_file.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(identifiers)?;
        fs::write(&self.ids_file, content)?;

        debug!(
            "Saved {} identifiers to {}",
            identifiers.len(),
            self.ids_file.display()
        );

        Ok(())
    }

    pub fn read_identifiers(&self) -> Result<Vec<Identifier>> {
        let content = fs::read_to_string(&self.ids_file)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes a raw response body as a batch artifact, replacing any previous one.
    pub fn write_batch(&self, file_name: &str, body: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.batch_dir)?;

        let path = self.batch_dir.join(file_name);
        fs::write(&path, body)?;

        Ok(path)
    }
}
