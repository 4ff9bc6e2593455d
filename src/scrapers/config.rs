//! Scraper configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::browser::BrowserEngineConfig;

/// Hybrid scraper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Fast path (plain HTTP GET) timeout in seconds.
    #[serde(default = "default_fast_timeout")]
    pub fast_timeout: u64,
    /// Slow path (headless browser) deadline in seconds.
    #[serde(default = "default_slow_timeout")]
    pub slow_timeout: u64,
    /// Fast path results shorter than this (in characters) escalate to the browser.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    /// Scraped text is truncated to this many characters.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,
    /// User agent configuration.
    /// - None: default contentpilot user agent
    /// - "impersonate": randomly select from real browser user agents
    /// - Any other string: use as custom user agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
}

fn default_fast_timeout() -> u64 {
    10
}

fn default_slow_timeout() -> u64 {
    60
}

fn default_min_content_chars() -> usize {
    200
}

fn default_max_content_chars() -> usize {
    15_000
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            fast_timeout: default_fast_timeout(),
            slow_timeout: default_slow_timeout(),
            min_content_chars: default_min_content_chars(),
            max_content_chars: default_max_content_chars(),
            user_agent: None,
            browser: BrowserEngineConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn fast_timeout(&self) -> Duration {
        Duration::from_secs(self.fast_timeout)
    }

    pub fn slow_timeout(&self) -> Duration {
        Duration::from_secs(self.slow_timeout)
    }

    /// Apply environment variable overrides.
    ///
    /// - `SCRAPER_USER_AGENT`: user agent config (see field docs)
    /// - `CHROME_REMOTE_URL`: DevTools URL of an already running browser
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SCRAPER_USER_AGENT") {
            if !val.trim().is_empty() {
                self.user_agent = Some(val);
            }
        }
        if let Ok(val) = std::env::var("CHROME_REMOTE_URL") {
            if !val.trim().is_empty() {
                self.browser.remote_url = Some(val);
            }
        }
        self
    }
}
