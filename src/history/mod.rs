//! Per-owner analysis history.
//!
//! The relay hands every completed analysis to a [`HistorySink`]. Writes are
//! best effort: failures are logged and never reach the client.

mod jsonl;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AnalysisResult, HistoryEntry, OwnerId};

pub use jsonl::JsonlHistorySink;
pub use memory::{MemoryHistorySink, DEFAULT_MEMORY_CAPACITY};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("History write timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Append-only store of completed analyses keyed by owner.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Record one completed analysis.
    async fn append(
        &self,
        owner: &OwnerId,
        input: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, HistoryError>;

    /// Most recent entries for an owner, newest first.
    async fn recent(&self, owner: &OwnerId, limit: usize)
        -> Result<Vec<HistoryEntry>, HistoryError>;
}

/// Which history backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Bounded in-process store, lost on restart.
    #[default]
    Memory,
    /// One JSON Lines file per owner.
    Jsonl,
}

impl HistoryBackend {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Some(Self::Memory),
            "jsonl" | "file" => Some(Self::Jsonl),
            _ => None,
        }
    }
}

/// History settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub backend: HistoryBackend,
    /// Directory for the jsonl backend.
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
    /// Entries kept per owner by the memory backend.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Upper bound on one history write, in seconds.
    #[serde(default = "default_write_timeout")]
    pub write_timeout: u64,
}

fn default_history_dir() -> PathBuf {
    PathBuf::from("history")
}

fn default_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY
}

fn default_write_timeout() -> u64 {
    10
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::default(),
            dir: default_history_dir(),
            capacity: default_capacity(),
            write_timeout: default_write_timeout(),
        }
    }
}

impl HistoryConfig {
    /// Apply `HISTORY_BACKEND` and `HISTORY_DIR`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("HISTORY_BACKEND") {
            match HistoryBackend::from_str(&val) {
                Some(backend) => self.backend = backend,
                None => tracing::warn!("Ignoring unknown HISTORY_BACKEND: {}", val),
            }
        }
        if let Ok(val) = std::env::var("HISTORY_DIR") {
            if !val.trim().is_empty() {
                self.dir = PathBuf::from(val);
            }
        }
        self
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    /// Construct the configured sink.
    pub fn build(&self) -> Arc<dyn HistorySink> {
        match self.backend {
            HistoryBackend::Memory => Arc::new(MemoryHistorySink::new(self.capacity)),
            HistoryBackend::Jsonl => Arc::new(JsonlHistorySink::new(&self.dir)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!(HistoryBackend::from_str("JSONL"), Some(HistoryBackend::Jsonl));
        assert_eq!(HistoryBackend::from_str("memory"), Some(HistoryBackend::Memory));
        assert_eq!(HistoryBackend::from_str("firestore"), None);
    }

    #[test]
    fn test_config_toml() {
        let config: HistoryConfig = toml::from_str("backend = \"jsonl\"\ndir = \"/tmp/h\"").unwrap();
        assert_eq!(config.backend, HistoryBackend::Jsonl);
        assert_eq!(config.dir, PathBuf::from("/tmp/h"));
        assert_eq!(config.capacity, 5);
    }
}
