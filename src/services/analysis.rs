//! The analysis pipeline for one request.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::extractor::Extractor;
use super::relay::{RelayOutcome, StreamRelay};
use crate::config::Settings;
use crate::documents::DocumentParser;
use crate::history::{HistoryError, HistorySink};
use crate::llm::{GeminiClient, GenerationClient};
use crate::models::{AnalysisRequest, AnalysisResult, OwnerId, StreamEvent};
use crate::prompt::PromptAssembler;
use crate::scrapers::HybridScraper;

/// Capacity of the per-request event channel.
pub const EVENT_BUFFER: usize = 32;

const DEFAULT_CHUNK_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_HISTORY_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs requests through extractor, prompt assembler, model and relay.
///
/// Holds only shared, thread-safe handles; each request gets its own relay
/// and channel.
pub struct AnalysisService {
    extractor: Arc<Extractor>,
    prompt: Arc<PromptAssembler>,
    generator: Arc<dyn GenerationClient>,
    history: Arc<dyn HistorySink>,
    chunk_timeout: Duration,
    history_timeout: Duration,
}

impl AnalysisService {
    pub fn new(
        extractor: Arc<Extractor>,
        prompt: Arc<PromptAssembler>,
        generator: Arc<dyn GenerationClient>,
        history: Arc<dyn HistorySink>,
    ) -> Self {
        Self {
            extractor,
            prompt,
            generator,
            history,
            chunk_timeout: DEFAULT_CHUNK_TIMEOUT,
            history_timeout: DEFAULT_HISTORY_TIMEOUT,
        }
    }

    /// Wire up the production collaborators from settings.
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let scraper = HybridScraper::from_config(&settings.scraper)?;
        let documents = DocumentParser::new(settings.documents.parse_timeout());
        let generator = GeminiClient::new(settings.gemini.clone())?;
        if !settings.gemini.is_configured() {
            warn!("GEMINI_API_KEY is not set; generation requests will fail");
        }

        Ok(Self::new(
            Arc::new(Extractor::new(scraper, documents)),
            Arc::new(PromptAssembler::from_template(
                settings.prompt.instruction.as_deref(),
            )),
            Arc::new(generator),
            settings.history.build(),
        )
        .with_chunk_timeout(settings.gemini.chunk_timeout())
        .with_history_timeout(settings.history.write_timeout()))
    }

    pub fn with_chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = timeout;
        self
    }

    pub fn with_history_timeout(mut self, timeout: Duration) -> Self {
        self.history_timeout = timeout;
        self
    }

    pub fn history(&self) -> Arc<dyn HistorySink> {
        Arc::clone(&self.history)
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Start processing on a new task and return the event receiver.
    ///
    /// Dropping the receiver cancels the request.
    pub fn start(
        self: &Arc<Self>,
        request: AnalysisRequest,
        owner: Option<OwnerId>,
    ) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.process(request, owner, tx).await;
        });
        rx
    }

    /// Process one request, sending its events on `tx`.
    ///
    /// The channel is closed before the history write, so the client's
    /// stream ends as soon as the terminal event is out.
    pub async fn process(
        &self,
        request: AnalysisRequest,
        owner: Option<OwnerId>,
        tx: mpsc::Sender<StreamEvent>,
    ) -> RelayOutcome {
        let (outcome, descriptor) = {
            let watcher = tx.clone();
            tokio::select! {
                result = self.pipeline(request, tx) => result,
                _ = watcher.closed() => (RelayOutcome::Disconnected, None),
            }
        };

        match &outcome {
            RelayOutcome::Completed(result) => {
                info!("Analysis completed");
                if let (Some(owner), Some(descriptor)) = (owner, descriptor) {
                    self.record_history(&owner, &descriptor, result).await;
                }
            }
            RelayOutcome::Failed(err) => {
                error!(kind = err.kind(), "Analysis failed: {}", err);
            }
            RelayOutcome::Disconnected => {
                info!("Client disconnected; request cancelled");
            }
        }

        outcome
    }

    async fn pipeline(
        &self,
        request: AnalysisRequest,
        tx: mpsc::Sender<StreamEvent>,
    ) -> (RelayOutcome, Option<String>) {
        let relay = StreamRelay::new(tx);

        let input = match request.resolve() {
            Ok(input) => input,
            Err(e) => return (relay.fail(e).await, None),
        };
        let descriptor = input.source.descriptor();
        info!("Processing {} input", input.source.kind());

        let content = match self.extractor.extract(input.source).await {
            Ok(content) => content,
            Err(e) => return (relay.fail(e).await, Some(descriptor)),
        };

        let parts = self.prompt.assemble(content);
        debug!("Assembled {} prompt parts", parts.len());

        let stream = match self.generator.generate_stream(&parts, input.params).await {
            Ok(stream) => stream,
            Err(e) => return (relay.fail(e.into()).await, Some(descriptor)),
        };

        (relay.run(stream, self.chunk_timeout).await, Some(descriptor))
    }

    async fn record_history(&self, owner: &OwnerId, descriptor: &str, result: &AnalysisResult) {
        let written = tokio::time::timeout(
            self.history_timeout,
            self.history.append(owner, descriptor, result),
        )
        .await
        .unwrap_or(Err(HistoryError::Timeout(self.history_timeout)));

        match written {
            Ok(entry) => debug!("Recorded history entry {}", entry.id),
            Err(e) => warn!("Failed to record history: {}", e),
        }
    }
}
