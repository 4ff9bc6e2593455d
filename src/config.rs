//! Configuration loading.
//!
//! Settings come from an optional TOML (or JSON) file, then environment
//! variables override individual values. `.env` is loaded by `main` before
//! any of this runs.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::HistoryConfig;
use crate::identity::IdentityConfig;
use crate::llm::GeminiConfig;
use crate::scrapers::ScraperConfig;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "CONTENTPILOT_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body, in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit: default_body_limit(),
        }
    }
}

/// Document parser settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Upper bound on a single parse, in seconds.
    #[serde(default = "default_parse_timeout")]
    pub parse_timeout: u64,
}

fn default_parse_timeout() -> u64 {
    30
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            parse_timeout: default_parse_timeout(),
        }
    }
}

impl DocumentConfig {
    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout)
    }
}

/// Prompt settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Replaces the built-in instruction when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
}

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub documents: DocumentConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl Settings {
    /// Parse settings from file contents. JSON when the extension says so,
    /// TOML otherwise.
    pub fn from_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(contents)?),
            _ => Ok(toml::from_str(contents)?),
        }
    }

    /// Load settings from a specific file path (no env overrides).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_str(&contents, path)
    }

    /// Apply environment variable overrides to every section.
    ///
    /// - `CONTENTPILOT_HOST`, `PORT`: listener address
    /// - `ANALYSIS_PROMPT`: instruction template
    /// - see [`GeminiConfig`], [`ScraperConfig`], [`HistoryConfig`] and
    ///   [`IdentityConfig`] for their variables
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("CONTENTPILOT_HOST") {
            if !val.trim().is_empty() {
                self.server.host = val.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("PORT") {
            match val.trim().parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT: {}", val),
            }
        }
        if let Ok(val) = std::env::var("ANALYSIS_PROMPT") {
            if !val.trim().is_empty() {
                self.prompt.instruction = Some(val);
            }
        }

        self.gemini = self.gemini.with_env_overrides();
        self.scraper = self.scraper.with_env_overrides();
        self.history = self.history.with_env_overrides();
        self.identity = self.identity.with_env_overrides();
        self
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path; falls back to `CONTENTPILOT_CONFIG`.
    pub config_path: Option<PathBuf>,
}

/// Load settings: file (if any), then environment overrides.
pub async fn load_settings(options: LoadOptions) -> Result<Settings, ConfigError> {
    let path = options.config_path.or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    });

    let settings = match path {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            Settings::load_from_path(&path).await?
        }
        None => Settings::default(),
    };

    Ok(settings.with_env_overrides())
}
