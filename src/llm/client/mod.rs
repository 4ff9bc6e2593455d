//! Streaming generation client.
//!
//! The model is a black box that takes prompt parts plus sampling parameters
//! and yields text fragments. [`GeminiClient`] is the production backend.

mod config;
mod gemini;
mod sse;

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::models::{ContentPart, GenerationParams};

pub use config::{GeminiConfig, SAFETY_THRESHOLDS};
pub use gemini::{GeminiClient, HARM_CATEGORIES};
pub use sse::SseDecoder;

/// Lazy, finite stream of generated text fragments.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Errors from the generation backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("GEMINI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("The model is rate limited; please try again shortly")]
    RateLimited,

    #[error("Content blocked by safety filters ({0})")]
    Blocked(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("The model stopped responding for {}s", .0.as_secs())]
    IdleTimeout(Duration),
}

/// Something that can turn prompt parts into a text stream.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start a generation. Errors before the first fragment are returned
    /// directly; later failures arrive as stream items.
    async fn generate_stream(
        &self,
        parts: &[ContentPart],
        params: GenerationParams,
    ) -> Result<TextStream, LlmError>;
}
