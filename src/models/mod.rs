//! Data models for contentpilot.

mod analysis;
mod content;
mod event;
mod history;
mod input;

pub use analysis::{AnalysisResult, NO_ACTION_ITEMS, NO_NEXT_STEPS};
pub use content::ContentPart;
pub use event::StreamEvent;
pub use history::{HistoryEntry, OwnerId};
pub use input::{
    AnalysisInput, AnalysisRequest, ContentSource, DocumentPayload, GenerationParams,
    ImagePayload, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};
