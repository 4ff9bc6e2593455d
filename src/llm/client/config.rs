//! Gemini client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Block thresholds accepted by the Gemini API.
pub const SAFETY_THRESHOLDS: &[&str] = &[
    "BLOCK_NONE",
    "BLOCK_ONLY_HIGH",
    "BLOCK_MEDIUM_AND_ABOVE",
    "BLOCK_LOW_AND_ABOVE",
];

/// Configuration for the Gemini generation client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (usually supplied via `GEMINI_API_KEY`)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Threshold applied to every harm category
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: String,
    /// Upper bound on a whole generation request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Longest allowed gap between two streamed chunks, in seconds
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout: u64,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_safety_threshold() -> String {
    "BLOCK_MEDIUM_AND_ABOVE".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_chunk_timeout() -> u64 {
    90
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
            safety_threshold: default_safety_threshold(),
            request_timeout: default_request_timeout(),
            chunk_timeout: default_chunk_timeout(),
        }
    }
}

impl GeminiConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `GEMINI_API_KEY`: API key
    /// - `GEMINI_MODEL`: model name
    /// - `GEMINI_ENDPOINT`: API base URL
    /// - `GEMINI_SAFETY_THRESHOLD`: one of [`SAFETY_THRESHOLDS`]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("GEMINI_API_KEY") {
            if !val.trim().is_empty() {
                self.api_key = Some(val.trim().to_string());
            }
        }
        if let Ok(val) = std::env::var("GEMINI_MODEL") {
            if !val.trim().is_empty() {
                self.model = val.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("GEMINI_ENDPOINT") {
            if !val.trim().is_empty() {
                self.endpoint = val.trim().to_string();
            }
        }
        if let Ok(val) = std::env::var("GEMINI_SAFETY_THRESHOLD") {
            self = self.with_safety_threshold(&val);
        }
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Set the safety threshold; unknown values are ignored with a warning.
    pub fn with_safety_threshold(mut self, threshold: &str) -> Self {
        let normalized = threshold.trim().to_uppercase();
        if SAFETY_THRESHOLDS.contains(&normalized.as_str()) {
            self.safety_threshold = normalized;
        } else {
            warn!("Ignoring unknown safety threshold: {}", threshold);
        }
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout)
    }

    /// Streaming endpoint URL for the configured model.
    pub fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}
