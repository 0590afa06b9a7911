use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::PathBuf;

use crate::artifacts::ArtifactStore;
use crate::config::Config;
use crate::fetcher::{BatchStatusLog, Fetcher};
use crate::flatten::{self, ExportFormat};
use crate::output;

#[derive(Parser)]
#[command(name = "assign-collector")]
#[command(author, version, about = "TeamCity investigation dataset collector", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// TeamCity server URL
    #[arg(long, global = true)]
    host: Option<String>,

    /// External id of the project
    #[arg(short = 'P', long, global = true)]
    project: Option<String>,

    /// Access token
    #[arg(short, long, global = true, env = "TEAMCITY_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding every artifact
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover build/test identifiers and save them
    Ids {
        /// Maximum number of listing pages to follow
        #[arg(long)]
        max_pages: Option<usize>,
    },

    /// Fetch build records for the saved identifiers in batches
    Builds {
        /// Offset into the identifier list to start from
        #[arg(short, long)]
        start_from: Option<usize>,

        /// Identifiers per request
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Flatten saved batches into a single dataset
    Flatten {
        /// Output file (defaults to the configured dataset path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Pretty-print JSON output
        #[arg(short, long, default_value_t = false)]
        pretty: bool,
    },
}

impl Cli {
    /// Loads the configuration file and applies command-line overrides.
    fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.server.host = Some(host.clone());
        }
        if let Some(project) = &self.project {
            config.server.project_id = Some(project.clone());
        }
        if let Some(token) = &self.token {
            config.server.token = Some(token.clone());
        }
        if let Some(data_dir) = &self.data_dir {
            config.storage.data_dir = data_dir.clone();
        }

        match &self.command {
            Commands::Ids { max_pages } => {
                if let Some(max_pages) = max_pages {
                    config.fetch.max_pages = *max_pages;
                }
            }
            Commands::Builds {
                start_from,
                batch_size,
                timeout,
            } => {
                if let Some(start_from) = start_from {
                    config.fetch.start_from = *start_from;
                }
                if let Some(batch_size) = batch_size {
                    config.fetch.batch_size = *batch_size;
                }
                if let Some(timeout) = timeout {
                    config.server.timeout_secs = *timeout;
                }
            }
            Commands::Flatten { output, .. } => {
                if let Some(output) = output {
                    config.storage.output = output.clone();
                }
            }
        }

        Ok(config)
    }

    async fn execute_ids(config: &Config) -> Result<()> {
        let store = ArtifactStore::new(&config.storage);
        let fetcher = Fetcher::new(&config.server, store)?;

        let identifiers = fetcher
            .discover_identifiers(config.fetch.max_pages)
            .await
            .context("Failed to discover identifiers")?;

        info!("Discovered {} identifiers", identifiers.len());
        Ok(())
    }

    async fn execute_builds(config: &Config) -> Result<()> {
        let store = ArtifactStore::new(&config.storage);
        let identifiers = store.read_identifiers().with_context(|| {
            format!(
                "Failed to read identifiers from {} (run `ids` first)",
                store.ids_file().display()
            )
        })?;

        let fetcher = Fetcher::new(&config.server, store)?;
        let written = fetcher
            .fetch_batches(
                &identifiers,
                config.fetch.start_from,
                config.fetch.batch_size,
            )
            .await
            .context("Failed to fetch build batches")?;

        info!("Wrote {written} batch artifacts");
        Ok(())
    }

    fn execute_flatten(config: &Config, format: ExportFormat, pretty: bool) -> Result<()> {
        let store = ArtifactStore::new(&config.storage);

        let status = BatchStatusLog::load(store.status_file());
        for (batch, failure) in status.failures() {
            warn!(
                "Batch {batch} was fetched with status {} at {}; it may not parse",
                failure.status, failure.recorded_at
            );
        }

        let dataset = flatten::load(store.batch_dir()).with_context(|| {
            format!(
                "Failed to flatten batches in {}",
                store.batch_dir().display()
            )
        })?;

        flatten::write_dataset(&dataset, store.output_file(), format, pretty).with_context(
            || format!("Failed to write dataset: {}", store.output_file().display()),
        )?;
        info!("Dataset written to: {}", store.output_file().display());

        output::print_flatten_summary(&dataset, store.output_file());
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.resolve_config()?;

        match &self.command {
            Commands::Ids { .. } => Self::execute_ids(&config).await,
            Commands::Builds { .. } => Self::execute_builds(&config).await,
            Commands::Flatten { format, pretty, .. } => {
                Self::execute_flatten(&config, *format, *pretty)
            }
        }
    }
}
