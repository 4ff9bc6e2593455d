//! Fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use contentpilot::documents::DocumentParser;
use contentpilot::history::{HistoryError, HistorySink, MemoryHistorySink};
use contentpilot::llm::{GenerationClient, LlmError, TextStream};
use contentpilot::models::{
    AnalysisRequest, AnalysisResult, ContentPart, GenerationParams, HistoryEntry, OwnerId,
    StreamEvent,
};
use contentpilot::prompt::PromptAssembler;
use contentpilot::scrapers::{HybridScraper, PageFetcher, ScrapeError, ScraperConfig};
use contentpilot::services::{AnalysisService, Extractor, RelayOutcome, EVENT_BUFFER};

/// Model fake that replays fixed fragments and records every prompt.
pub struct ScriptedModel {
    fragments: Vec<String>,
    pub calls: AtomicUsize,
    pub prompts: Mutex<Vec<Vec<ContentPart>>>,
}

impl ScriptedModel {
    pub fn new(fragments: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Text parts of the most recent prompt, instruction excluded.
    pub fn last_content_text(&self) -> Vec<String> {
        let prompts = self.prompts.lock().unwrap();
        prompts
            .last()
            .map(|parts| {
                parts
                    .iter()
                    .skip(1)
                    .filter_map(|p| p.as_text().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl GenerationClient for ScriptedModel {
    async fn generate_stream(
        &self,
        parts: &[ContentPart],
        _params: GenerationParams,
    ) -> Result<TextStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(parts.to_vec());
        let items: Vec<Result<String, LlmError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

/// Page fetcher fake with a call counter.
pub struct CountingFetcher {
    result: Result<String, String>,
    pub calls: AtomicUsize,
}

impl CountingFetcher {
    pub fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for CountingFetcher {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn fetch_text(&self, _url: &str) -> Result<String, ScrapeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(ScrapeError::Browser)
    }
}

/// History sink whose writes always fail.
pub struct FailingHistory;

#[async_trait]
impl HistorySink for FailingHistory {
    async fn append(
        &self,
        _owner: &OwnerId,
        _input: &str,
        _result: &AnalysisResult,
    ) -> Result<HistoryEntry, HistoryError> {
        Err(HistoryError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only volume",
        )))
    }

    async fn recent(&self, _owner: &OwnerId, _limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(Vec::new())
    }
}

/// History sink whose writes never complete.
pub struct StalledHistory {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl HistorySink for StalledHistory {
    async fn append(
        &self,
        _owner: &OwnerId,
        _input: &str,
        _result: &AnalysisResult,
    ) -> Result<HistoryEntry, HistoryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        futures::future::pending().await
    }

    async fn recent(&self, _owner: &OwnerId, _limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(Vec::new())
    }
}

/// Builds a service around fake collaborators.
pub struct Harness {
    pub service: Arc<AnalysisService>,
    pub model: Arc<ScriptedModel>,
    pub history: Arc<dyn HistorySink>,
}

impl Harness {
    pub fn new(
        fast: Arc<dyn PageFetcher>,
        slow: Arc<dyn PageFetcher>,
        model: Arc<ScriptedModel>,
    ) -> Self {
        Self::build(fast, slow, model, Arc::new(MemoryHistorySink::default()), |s| s)
    }

    /// Full control over the history sink and service timeouts.
    pub fn build(
        fast: Arc<dyn PageFetcher>,
        slow: Arc<dyn PageFetcher>,
        model: Arc<ScriptedModel>,
        history: Arc<dyn HistorySink>,
        configure: impl FnOnce(AnalysisService) -> AnalysisService,
    ) -> Self {
        Self::build_with_parser(
            fast,
            slow,
            model,
            history,
            DocumentParser::new(Duration::from_secs(30)),
            configure,
        )
    }

    pub fn build_with_parser(
        fast: Arc<dyn PageFetcher>,
        slow: Arc<dyn PageFetcher>,
        model: Arc<ScriptedModel>,
        history: Arc<dyn HistorySink>,
        parser: DocumentParser,
        configure: impl FnOnce(AnalysisService) -> AnalysisService,
    ) -> Self {
        let scraper = HybridScraper::new(fast, slow, &ScraperConfig::default());
        let extractor = Extractor::new(scraper, parser);
        let service = AnalysisService::new(
            Arc::new(extractor),
            Arc::new(PromptAssembler::default()),
            model.clone(),
            history.clone(),
        );
        Self {
            service: Arc::new(configure(service)),
            model,
            history,
        }
    }

    /// A harness whose scraper should never be reached.
    pub fn with_model(model: Arc<ScriptedModel>) -> Self {
        Self::new(
            CountingFetcher::failing("unused"),
            CountingFetcher::failing("unused"),
            model,
        )
    }

    /// Like [`Harness::with_model`], with a custom history sink.
    pub fn with_history(
        model: Arc<ScriptedModel>,
        history: Arc<dyn HistorySink>,
        configure: impl FnOnce(AnalysisService) -> AnalysisService,
    ) -> Self {
        Self::build(
            CountingFetcher::failing("unused"),
            CountingFetcher::failing("unused"),
            model,
            history,
            configure,
        )
    }

    /// Like [`Harness::with_model`], with a custom document parse timeout.
    pub fn with_parse_timeout(model: Arc<ScriptedModel>, timeout: Duration) -> Self {
        Self::build_with_parser(
            CountingFetcher::failing("unused"),
            CountingFetcher::failing("unused"),
            model,
            Arc::new(MemoryHistorySink::default()),
            DocumentParser::new(timeout),
            |s| s,
        )
    }

    /// Run one request to completion, collecting every event.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        owner: Option<&str>,
    ) -> (RelayOutcome, Vec<StreamEvent>) {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let drain = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                events.push(event);
            }
            events
        });

        let owner = owner.and_then(OwnerId::new);
        let outcome = self.service.process(request, owner, tx).await;
        (outcome, drain.await.unwrap())
    }

    pub async fn history_len(&self, owner: &str) -> usize {
        let owner = OwnerId::new(owner).unwrap();
        self.history.recent(&owner, 100).await.unwrap().len()
    }
}

/// The event sequence ends in exactly one terminal event.
pub fn assert_single_terminal(events: &[StreamEvent]) {
    let terminals = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(terminals, 1, "events: {:?}", events);
    assert!(events.last().unwrap().is_terminal());
}

pub fn chunk_texts(events: &[StreamEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Chunk { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

pub fn error_message(events: &[StreamEvent]) -> Option<&str> {
    events.iter().find_map(|e| match e {
        StreamEvent::Error { message } => Some(message.as_str()),
        _ => None,
    })
}

/// A small uncompressed PDF with one line of Helvetica text per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        {
            let kids: Vec<String> = (0..pages.len())
                .map(|i| format!("{} 0 R", 4 + 2 * i))
                .collect();
            format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                pages.len()
            )
        },
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
            .to_string(),
    ];

    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + 2 * i
        ));
        let content = format!("BT /F1 18 Tf 72 700 Td ({}) Tj ET", text);
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}\nendstream",
            content.len(),
            content
        ));
    }

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, object));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in offsets {
        out.push_str(&format!("{:010} 00000 n \n", offset));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    out.into_bytes()
}
