//! Web page text acquisition.
//!
//! Two tiers share the [`PageFetcher`] interface: a plain HTTP fetch parsed
//! with `scraper`, and a headless Chromium session for pages that only render
//! their content with JavaScript. [`HybridScraper`] picks between them.

pub mod browser;
pub mod config;
mod html;
mod http_client;
mod hybrid;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use browser::{BrowserEngineConfig, BrowserFetcher};
pub use config::ScraperConfig;
pub use html::{extract_main_text, EXCLUDED_ELEMENTS};
pub use http_client::{resolve_user_agent, HttpClient, IMPERSONATE_USER_AGENTS, USER_AGENT};
pub use hybrid::HybridScraper;

/// Errors from fetching or rendering a page.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Browser support not compiled. Rebuild with: cargo build --features browser")]
    BrowserUnavailable,

    #[error("Failed to fetch dynamic content from URL. The page may be too complex or protected.")]
    Exhausted,
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Http(err.to_string())
    }
}

/// One way of turning a URL into the page's main text.
///
/// Implementations return whitespace-collapsed text; truncation and the
/// sufficiency decision belong to the caller.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError>;
}
