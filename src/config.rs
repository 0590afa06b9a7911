use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::auth::Token;
use crate::error::CollectorError;

/// Configuration file structure for assign-collector.
///
/// Holds everything both stages need so it can be passed explicitly into the
/// fetcher and the flattener. Files are looked up in the current directory
/// unless a path is given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// TeamCity connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Batch fetching parameters
    #[serde(default)]
    pub fetch: FetchConfig,

    /// On-disk artifact layout
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// TeamCity server base URL
    pub host: Option<String>,

    /// External id of the project to collect
    pub project_id: Option<String>,

    /// Access token sent as a bearer credential
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Listing endpoint returning build/test identifiers
    #[serde(default = "default_ids_endpoint")]
    pub ids_endpoint: String,

    /// Detail endpoint returning build records
    #[serde(default = "default_builds_endpoint")]
    pub builds_endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Number of identifiers requested per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Offset into the identifier list to resume from
    #[serde(default)]
    pub start_from: usize,

    /// Upper bound on listing pages followed during discovery
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Root directory for every artifact
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Identifier artifact, relative to the data directory
    #[serde(default = "default_ids_file")]
    pub ids_file: PathBuf,

    /// Batch artifact directory, relative to the data directory
    #[serde(default = "default_batch_dir")]
    pub batch_dir: PathBuf,

    /// Sidecar listing batches that came back with an error status
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,

    /// Flattened dataset, relative to the data directory
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: None,
            project_id: None,
            token: None,
            timeout_secs: default_timeout_secs(),
            ids_endpoint: default_ids_endpoint(),
            builds_endpoint: default_builds_endpoint(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            start_from: 0,
            max_pages: default_max_pages(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ids_file: default_ids_file(),
            batch_dir: default_batch_dir(),
            status_file: default_status_file(),
            output: default_output(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_ids_endpoint() -> String {
    "buildTestIdsCollector.html".to_string()
}

fn default_builds_endpoint() -> String {
    "assignInfoCollector.html".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_max_pages() -> usize {
    1000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_ids_file() -> PathBuf {
    PathBuf::from("build_ids.json")
}

fn default_batch_dir() -> PathBuf {
    PathBuf::from("build_info")
}

fn default_status_file() -> PathBuf {
    PathBuf::from("failed_batches.json")
}

fn default_output() -> PathBuf {
    PathBuf::from("investigations.csv")
}

impl ServerConfig {
    /// Server base URL, required by both fetch stages.
    pub fn host(&self) -> crate::error::Result<&str> {
        self.host
            .as_deref()
            .filter(|host| !host.trim().is_empty())
            .ok_or_else(|| CollectorError::Config("server host is not set".into()))
    }

    pub fn project_id(&self) -> crate::error::Result<&str> {
        self.project_id
            .as_deref()
            .filter(|project| !project.trim().is_empty())
            .ok_or_else(|| CollectorError::Config("project id is not set".into()))
    }

    pub fn token(&self) -> Option<Token> {
        self.token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .map(Token::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./assign-collector.toml
    /// 3. ./assign-collector.json
    /// 4. ./assign-collector.yaml
    /// 5. ./assign-collector.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "assign-collector.toml",
            "assign-collector.json",
            "assign-collector.yaml",
            "assign-collector.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.timeout_secs, 60);
        assert_eq!(config.server.ids_endpoint, "buildTestIdsCollector.html");
        assert_eq!(config.server.builds_endpoint, "assignInfoCollector.html");
        assert_eq!(config.fetch.batch_size, 100);
        assert_eq!(config.fetch.start_from, 0);
        assert_eq!(config.fetch.max_pages, 1000);
        assert_eq!(config.storage.batch_dir, PathBuf::from("build_info"));
        assert_eq!(config.storage.output, PathBuf::from("investigations.csv"));
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[server]
host = "https://teamcity.example.com"
project-id = "Backend"
token = "tc-token"
timeout-secs = 15

[fetch]
batch-size = 25
start-from = 50

[storage]
data-dir = "/tmp/collector"
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.server.host().unwrap(), "https://teamcity.example.com");
        assert_eq!(config.server.project_id().unwrap(), "Backend");
        assert_eq!(config.server.token().unwrap().as_str(), "tc-token");
        assert_eq!(config.server.timeout(), Duration::from_secs(15));
        assert_eq!(config.fetch.batch_size, 25);
        assert_eq!(config.fetch.start_from, 50);
        assert_eq!(config.fetch.max_pages, 1000);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/collector"));
        assert_eq!(config.storage.ids_file, PathBuf::from("build_ids.json"));
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "server": {
    "host": "https://tc.json.example",
    "builds-endpoint": "custom.html"
  },
  "fetch": {
    "max-pages": 3
  }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.server.host().unwrap(), "https://tc.json.example");
        assert_eq!(config.server.builds_endpoint, "custom.html");
        assert_eq!(config.fetch.max_pages, 3);
        assert_eq!(config.fetch.batch_size, 100);
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml_content = "storage:\n  batch-dir: batches\n  output: out.csv\n";
        write!(temp_file, "{}", yaml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.storage.batch_dir, PathBuf::from("batches"));
        assert_eq!(config.storage.output, PathBuf::from("out.csv"));
        assert!(config.server.host.is_none());
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let result = Config::load(Some(Path::new("does-not-exist.toml")));
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Failed to read config file"));
    }

    #[test]
    fn test_missing_host_and_project_are_config_errors() {
        let server = ServerConfig {
            host: Some("   ".to_string()),
            ..ServerConfig::default()
        };

        assert!(matches!(server.host(), Err(CollectorError::Config(_))));
        assert!(matches!(server.project_id(), Err(CollectorError::Config(_))));
        assert!(server.token().is_none());
    }
}
