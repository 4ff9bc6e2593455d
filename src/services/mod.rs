//! Request pipeline: extraction, prompting, generation and relay.
//!
//! Kept free of HTTP concerns so the same pipeline backs the server and the
//! CLI.

pub mod analysis;
pub mod extractor;
pub mod relay;

pub use analysis::{AnalysisService, EVENT_BUFFER};
pub use extractor::Extractor;
pub use relay::{RelayOutcome, RelayState, StreamRelay};
