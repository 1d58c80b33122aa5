//! Configuration management for storyarc using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm::LlmConfig;
use crate::output::{format_for_path, OutputFormat};

/// Default maximum extracted story length sent to the model (about 8000 tokens).
pub const DEFAULT_CHAR_LIMIT: usize = 32_000;

/// Settings for the annotation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// First dataset row to process (0-based).
    #[serde(default)]
    pub start_row: usize,
    /// Maximum number of stories to process (0 = unlimited).
    #[serde(default)]
    pub limit: usize,
    /// Stories longer than this many characters are skipped.
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,
    /// Extra attempts for transient failures (0 = single attempt).
    #[serde(default)]
    pub retries: u32,
    /// Base delay for exponential backoff between attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Stop the run on the first missing or rejected credential
    /// instead of skipping the story.
    #[serde(default)]
    pub halt_on_credential_error: bool,
}

fn default_char_limit() -> usize {
    DEFAULT_CHAR_LIMIT
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            start_row: 0,
            limit: 0,
            char_limit: default_char_limit(),
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            halt_on_credential_error: false,
        }
    }
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// CSV dataset with a `content` column.
    #[serde(default = "default_dataset")]
    pub dataset: String,
    /// Output file for annotations.
    #[serde(default = "default_output")]
    pub output: String,
    /// Output format; inferred from the output extension when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// File this config was loaded from.
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_dataset() -> String {
    "stories.csv".to_string()
}

fn default_output() -> String {
    "annotations.json".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            output: default_output(),
            output_format: None,
            pipeline: PipelineConfig::default(),
            llm: LlmConfig::default(),
            source_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults with env overrides when no file is found.
    pub async fn load() -> Self {
        match prefer::load("storyarc").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML, and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext).map_err(|(format, message)| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                format,
                message,
            }
        })?;

        config.source_path = Some(path.to_path_buf());
        config.llm = config.llm.with_env_overrides();
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, (&'static str, String)> {
        match ext {
            "toml" => toml::from_str(contents).map_err(|e| ("TOML", e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ("YAML", e.to_string())),
            _ => serde_json::from_str(contents).map_err(|e| ("JSON", e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against the config file's directory, or CWD
    pub fn resolve_path(&self, path_str: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.base_dir() {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.resolve_path(&self.dataset)
    }

    pub fn output_path(&self) -> PathBuf {
        self.resolve_path(&self.output)
    }

    /// Configured output format, or the one implied by the output extension.
    pub fn effective_output_format(&self) -> OutputFormat {
        self.output_format
            .unwrap_or_else(|| format_for_path(Path::new(&self.output)))
    }

    /// Render as TOML with the API key redacted.
    pub fn to_display_toml(&self) -> String {
        let mut s = toml::to_string_pretty(self).unwrap_or_default();
        if self.llm.api_key.is_some() {
            s.push_str("\n# llm.api_key is set (redacted)\n");
        }
        s
    }
}
