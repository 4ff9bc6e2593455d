//! Browser engine configuration types.

use serde::{Deserialize, Serialize};

/// Headless browser settings for the slow scrape path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Explicit Chrome/Chromium executable. Discovered when unset.
    #[serde(default)]
    pub chrome_path: Option<String>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// How long the resource count must stay unchanged before the page is
    /// considered idle, in milliseconds.
    #[serde(default = "default_idle_quiet_ms")]
    pub idle_quiet_ms: u64,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_idle_quiet_ms() -> u64 {
    500
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            idle_quiet_ms: default_idle_quiet_ms(),
        }
    }
}
