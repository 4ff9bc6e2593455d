//! Headless browser fetcher for JavaScript-rendered pages.
//!
//! Uses chromiumoxide (CDP). Every fetch gets its own browser process that is
//! torn down on every exit path; see [`BrowserSession`].

mod config;

pub use config::{default_headless, default_idle_quiet_ms, BrowserEngineConfig};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
#[cfg(feature = "browser")]
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tokio::time::Instant;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;

#[cfg(feature = "browser")]
use super::html::EXCLUDED_ELEMENTS;
use super::{PageFetcher, ScrapeError};
#[cfg(feature = "browser")]
use crate::utils::collapse_whitespace;

/// Resource count poll interval while waiting for network idle.
#[cfg(feature = "browser")]
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Time reserved after the idle wait for extracting the page text.
#[cfg(feature = "browser")]
const EXTRACTION_BUDGET: Duration = Duration::from_secs(5);

/// Upper bound on closing one tab during teardown.
#[cfg(feature = "browser")]
const PAGE_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(feature = "browser")]
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// When the idle wait must give up so extraction still fits before `deadline`.
#[cfg(feature = "browser")]
fn idle_deadline(deadline: Instant, now: Instant) -> Instant {
    deadline
        .checked_sub(EXTRACTION_BUDGET)
        .map_or(now, |d| d.max(now))
}

/// Removes non-content elements from the live DOM and returns the visible
/// text of article, then main, then body.
#[cfg(feature = "browser")]
fn extraction_script() -> String {
    format!(
        r#"(() => {{
            document.querySelectorAll('{}').forEach((el) => el.remove());
            const pick = (sel) => Array.from(document.querySelectorAll(sel))
                .map((el) => el.innerText || '')
                .join(' ')
                .trim();
            return pick('article') || pick('main') || (document.body ? document.body.innerText : '') || '';
        }})()"#,
        EXCLUDED_ELEMENTS.join(", ")
    )
}

/// Browser-based fetcher. Launches (or connects to) Chromium per fetch.
pub struct BrowserFetcher {
    config: BrowserEngineConfig,
    deadline: std::time::Duration,
    active: Arc<AtomicUsize>,
}

impl BrowserFetcher {
    /// Common Chrome executable paths to check.
    #[cfg(feature = "browser")]
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Create a fetcher whose fetches must finish within `deadline`.
    pub fn new(config: BrowserEngineConfig, deadline: std::time::Duration) -> Self {
        Self {
            config,
            deadline,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of browser sessions currently alive.
    pub fn active_sessions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(feature = "browser")]
impl BrowserFetcher {
    /// Find a Chrome executable.
    fn find_chrome(&self) -> Result<std::path::PathBuf, ScrapeError> {
        if let Some(ref path) = self.config.chrome_path {
            return Ok(std::path::PathBuf::from(path));
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        debug!("Found Chrome in PATH: {}", path);
                        return Ok(std::path::PathBuf::from(path));
                    }
                }
            }
        }

        Err(ScrapeError::Browser(
            "Chrome/Chromium not found. Install chromium or set browser.chrome_path".to_string(),
        ))
    }

    /// Launch a fresh browser, or attach to the configured remote one.
    async fn open_session(&self) -> Result<BrowserSession, ScrapeError> {
        if let Some(ref remote_url) = self.config.remote_url {
            return self.connect_remote(remote_url).await;
        }

        let chrome_path = self.find_chrome()?;
        info!("Launching browser (headless={})", self.config.headless);

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(self.deadline);

        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-software-rasterizer");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession::new(browser, handler_task, true, &self.active))
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(&self, url: &str) -> Result<BrowserSession, ScrapeError> {
        info!("Connecting to remote browser at {}", url);

        // Get WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .timeout(self.deadline)
            .send()
            .await?
            .json()
            .await?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ScrapeError::Browser("No webSocketDebuggerUrl in response".into()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: self.deadline,
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| ScrapeError::Browser(format!("Failed to connect to browser: {}", e)))?;

        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(BrowserSession::new(browser, handler_task, false, &self.active))
    }

    /// Navigate, wait for the network to settle, and extract the page text.
    ///
    /// The page is registered with the session, which closes it on teardown.
    async fn render(
        &self,
        session: &BrowserSession,
        url: &str,
        deadline: Instant,
    ) -> Result<String, ScrapeError> {
        let browser = session.browser()?;

        let page = tokio::time::timeout_at(deadline, browser.new_page("about:blank"))
            .await
            .map_err(|_| ScrapeError::Timeout(self.deadline))?
            .map_err(|e| ScrapeError::Browser(e.to_string()))?;
        session.track(page.clone());

        info!("Navigating to {}", url);
        match tokio::time::timeout_at(deadline, page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ScrapeError::Browser(format!("Navigation failed: {}", e))),
            Err(_) => return Err(ScrapeError::Timeout(self.deadline)),
        }

        self.wait_for_network_idle(&page, idle_deadline(deadline, Instant::now()))
            .await;

        match tokio::time::timeout_at(deadline, page.evaluate(extraction_script())).await {
            Ok(Ok(result)) => result
                .into_value::<String>()
                .map(|t| collapse_whitespace(&t))
                .map_err(|e| ScrapeError::Browser(format!("Unexpected extraction result: {}", e))),
            Ok(Err(e)) => Err(ScrapeError::Browser(format!("Extraction failed: {}", e))),
            Err(_) => Err(ScrapeError::Timeout(self.deadline)),
        }
    }

    /// Poll the resource timing count until it stops changing.
    ///
    /// Gives up at `deadline`; extraction proceeds either way.
    async fn wait_for_network_idle(&self, page: &Page, deadline: Instant) {
        let quiet = Duration::from_millis(self.config.idle_quiet_ms);
        let mut last_count: Option<u64> = None;
        let mut stable_since = Instant::now();

        while Instant::now() < deadline {
            let count = match tokio::time::timeout_at(deadline, page.evaluate(RESOURCE_COUNT_SCRIPT)).await {
                Ok(Ok(result)) => result.into_value::<u64>().ok(),
                Ok(Err(e)) => {
                    debug!("Resource count unavailable: {}", e);
                    None
                }
                Err(_) => break,
            };

            if count.is_some() && count == last_count {
                if stable_since.elapsed() >= quiet {
                    debug!("Network idle after {:?} resources", count);
                    return;
                }
            } else {
                last_count = count;
                stable_since = Instant::now();
            }

            tokio::time::sleep_until((Instant::now() + IDLE_POLL_INTERVAL).min(deadline)).await;
        }

        warn!("Network did not go idle before deadline; extracting anyway");
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    /// One deadline covers launch, navigation, idle wait and extraction.
    async fn fetch_text(&self, url: &str) -> Result<String, ScrapeError> {
        let deadline = Instant::now() + self.deadline;
        let session = tokio::time::timeout_at(deadline, self.open_session())
            .await
            .map_err(|_| ScrapeError::Timeout(self.deadline))??;
        let result = self.render(&session, url, deadline).await;
        session.close().await;
        result
    }
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
#[async_trait]
impl PageFetcher for BrowserFetcher {
    fn name(&self) -> &'static str {
        "browser"
    }

    async fn fetch_text(&self, _url: &str) -> Result<String, ScrapeError> {
        let _ = (&self.config, self.deadline);
        Err(ScrapeError::BrowserUnavailable)
    }
}

/// One live browser. Counted in the owning fetcher's session counter.
///
/// [`BrowserSession::close`] closes the session's tabs and then the process.
/// Dropping the session without closing it (e.g. when the request is
/// cancelled) hands the same teardown to a background task, so a remote
/// browser does not keep orphaned tabs and a launched one is killed.
#[cfg(feature = "browser")]
struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<tokio::task::JoinHandle<()>>,
    pages: std::sync::Mutex<Vec<Page>>,
    launched: bool,
    active: Arc<AtomicUsize>,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    fn new(
        browser: Browser,
        handler: tokio::task::JoinHandle<()>,
        launched: bool,
        active: &Arc<AtomicUsize>,
    ) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            browser: Some(browser),
            handler: Some(handler),
            pages: std::sync::Mutex::new(Vec::new()),
            launched,
            active: Arc::clone(active),
        }
    }

    fn browser(&self) -> Result<&Browser, ScrapeError> {
        self.browser
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("browser session already closed".into()))
    }

    fn track(&self, page: Page) {
        if let Ok(mut pages) = self.pages.lock() {
            pages.push(page);
        }
    }

    fn take_pages(&mut self) -> Vec<Page> {
        match self.pages.get_mut() {
            Ok(pages) => std::mem::take(pages),
            Err(poisoned) => std::mem::take(poisoned.into_inner()),
        }
    }

    async fn close(mut self) {
        close_pages(self.take_pages()).await;
        if let Some(mut browser) = self.browser.take() {
            if self.launched {
                if let Err(e) = browser.close().await {
                    debug!("Browser close failed: {}", e);
                }
                if let Err(e) = browser.wait().await {
                    debug!("Browser wait failed: {}", e);
                }
            }
        }
        // Drop runs next, stops the handler and releases the counter.
    }
}

#[cfg(feature = "browser")]
async fn close_pages(pages: Vec<Page>) {
    for page in pages {
        match tokio::time::timeout(PAGE_CLOSE_TIMEOUT, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("Page close failed: {}", e),
            Err(_) => debug!("Page close timed out"),
        }
    }
}

#[cfg(feature = "browser")]
impl Drop for BrowserSession {
    fn drop(&mut self) {
        let pages = self.take_pages();
        let browser = self.browser.take();
        let handler = self.handler.take();
        let active = Arc::clone(&self.active);

        let teardown = move || {
            drop(browser);
            if let Some(handler) = handler {
                handler.abort();
            }
            active.fetch_sub(1, Ordering::SeqCst);
        };

        // Tabs need the handler alive to be closed.
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) if !pages.is_empty() => {
                runtime.spawn(async move {
                    close_pages(pages).await;
                    teardown();
                });
            }
            _ => teardown(),
        }
    }
}
