//! Two-tier scraping policy: cheap HTTP first, headless browser on demand.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::browser::BrowserFetcher;
use super::config::ScraperConfig;
use super::http_client::HttpClient;
use super::{PageFetcher, ScrapeError};
use crate::utils::truncate_chars;

/// Extra time past `slow_timeout` before the slow tier is abandoned. The
/// tier enforces `slow_timeout` itself and cleans up before returning.
const SLOW_PATH_GRACE: Duration = Duration::from_secs(5);

/// Fetches a page's main text, escalating to the browser only when the
/// static fetch yields too little.
#[derive(Clone)]
pub struct HybridScraper {
    fast: Arc<dyn PageFetcher>,
    slow: Arc<dyn PageFetcher>,
    slow_timeout: Duration,
    min_content_chars: usize,
    max_content_chars: usize,
}

impl HybridScraper {
    /// Build the production scraper: reqwest fast path, Chromium slow path.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let fast = HttpClient::with_user_agent(config.fast_timeout(), config.user_agent.as_deref())?;
        let slow = BrowserFetcher::new(config.browser.clone(), config.slow_timeout());
        Ok(Self::new(Arc::new(fast), Arc::new(slow), config))
    }

    /// Build with explicit tiers.
    pub fn new(
        fast: Arc<dyn PageFetcher>,
        slow: Arc<dyn PageFetcher>,
        config: &ScraperConfig,
    ) -> Self {
        Self {
            fast,
            slow,
            slow_timeout: config.slow_timeout(),
            min_content_chars: config.min_content_chars,
            max_content_chars: config.max_content_chars,
        }
    }

    /// Produce up to `max_content_chars` of the page's primary text.
    ///
    /// The slow path runs at most once, and only if the fast path failed or
    /// returned fewer than `min_content_chars` characters.
    pub async fn scrape(&self, url: &str) -> Result<String, ScrapeError> {
        let fast_text = match self.fast.fetch_text(url).await {
            Ok(text) => text,
            Err(e) => {
                warn!("Fast fetch of {} failed: {}", url, e);
                String::new()
            }
        };

        let fast_len = fast_text.chars().count();
        if fast_len >= self.min_content_chars {
            debug!("Fast path sufficient for {} ({} chars)", url, fast_len);
            return Ok(truncate_chars(&fast_text, self.max_content_chars));
        }

        info!(
            "Fast path returned {} chars for {}; falling back to {}",
            fast_len,
            url,
            self.slow.name()
        );

        let backstop = self.slow_timeout + SLOW_PATH_GRACE;
        let slow_text = match tokio::time::timeout(backstop, self.slow.fetch_text(url)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!("Slow fetch of {} failed: {}", url, e);
                return Err(ScrapeError::Exhausted);
            }
            Err(_) => {
                warn!("Slow fetch of {} exceeded {}s", url, backstop.as_secs());
                return Err(ScrapeError::Exhausted);
            }
        };

        if slow_text.is_empty() {
            warn!("Slow fetch of {} produced no text", url);
            return Err(ScrapeError::Exhausted);
        }

        Ok(truncate_chars(&slow_text, self.max_content_chars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeFetcher {
        result: Result<String, &'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeFetcher {
        fn ok(text: &str) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(text.to_string()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                result: Err("connection refused"),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(text: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(text.to_string()),
                delay,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_text(&self, _url: &str) -> Result<String, ScrapeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result
                .clone()
                .map_err(|e| ScrapeError::Browser(e.to_string()))
        }
    }

    fn scraper(fast: Arc<FakeFetcher>, slow: Arc<FakeFetcher>) -> HybridScraper {
        HybridScraper::new(fast, slow, &ScraperConfig::default())
    }

    #[tokio::test]
    async fn test_sufficient_fast_path_skips_browser() {
        let fast = FakeFetcher::ok(&"word ".repeat(100));
        let slow = FakeFetcher::ok("unused");
        let text = scraper(fast.clone(), slow.clone())
            .scrape("http://example.com")
            .await
            .unwrap();

        assert_eq!(text.chars().count(), 500);
        assert_eq!(fast.calls(), 1);
        assert_eq!(slow.calls(), 0);
    }

    #[tokio::test]
    async fn test_short_fast_path_escalates_once() {
        let fast = FakeFetcher::ok("Loading...");
        let slow = FakeFetcher::ok("Rendered content");
        let text = scraper(fast.clone(), slow.clone())
            .scrape("http://example.com/app")
            .await
            .unwrap();

        assert_eq!(text, "Rendered content");
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_fast_failure_escalates() {
        let fast = FakeFetcher::failing();
        let slow = FakeFetcher::ok("from the browser");
        let text = scraper(fast, slow.clone()).scrape("http://x.test").await.unwrap();
        assert_eq!(text, "from the browser");
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn test_threshold_counts_characters() {
        // 199 two-byte characters: still below the 200 character minimum.
        let fast = FakeFetcher::ok(&"é".repeat(199));
        let slow = FakeFetcher::ok("slow");
        scraper(fast, slow.clone()).scrape("http://x.test").await.unwrap();
        assert_eq!(slow.calls(), 1);

        let fast = FakeFetcher::ok(&"é".repeat(200));
        let slow = FakeFetcher::ok("slow");
        scraper(fast, slow.clone()).scrape("http://x.test").await.unwrap();
        assert_eq!(slow.calls(), 0);
    }

    #[tokio::test]
    async fn test_output_is_truncated() {
        let fast = FakeFetcher::ok(&"a".repeat(20_000));
        let text = scraper(fast, FakeFetcher::ok(""))
            .scrape("http://x.test")
            .await
            .unwrap();
        assert_eq!(text.chars().count(), 15_000);

        let slow = FakeFetcher::ok(&"b".repeat(16_000));
        let text = scraper(FakeFetcher::ok(""), slow)
            .scrape("http://x.test")
            .await
            .unwrap();
        assert_eq!(text.chars().count(), 15_000);
    }

    #[tokio::test]
    async fn test_both_tiers_failing_is_exhausted() {
        let err = scraper(FakeFetcher::ok(""), FakeFetcher::failing())
            .scrape("http://x.test")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Exhausted));
        assert!(err.to_string().contains("too complex or protected"));

        let err = scraper(FakeFetcher::ok(""), FakeFetcher::ok(""))
            .scrape("http://x.test")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Exhausted));
    }

    #[tokio::test]
    async fn test_short_slow_result_is_accepted() {
        let text = scraper(FakeFetcher::ok(""), FakeFetcher::ok("tiny"))
            .scrape("http://x.test")
            .await
            .unwrap();
        assert_eq!(text, "tiny");
    }

    #[tokio::test]
    async fn test_slow_path_deadline() {
        let config = ScraperConfig {
            slow_timeout: 1,
            ..Default::default()
        };
        let slow = FakeFetcher::slow("late", Duration::from_secs(30));
        let err = HybridScraper::new(FakeFetcher::ok(""), slow, &config)
            .scrape("http://x.test")
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Exhausted));
    }

    #[tokio::test]
    async fn test_slow_tier_owns_its_deadline() {
        let config = ScraperConfig {
            slow_timeout: 1,
            ..Default::default()
        };
        let slow = FakeFetcher::slow("rendered late", Duration::from_millis(1_500));
        let text = HybridScraper::new(FakeFetcher::ok(""), slow, &config)
            .scrape("http://x.test")
            .await
            .unwrap();
        assert_eq!(text, "rendered late");
    }
}
