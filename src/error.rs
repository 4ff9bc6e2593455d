//! Request-level error taxonomy.
//!
//! Every failure a request can hit is folded into [`AnalysisError`] before it
//! reaches the relay, which turns it into the single terminal `error` event.

use std::time::Duration;

use thiserror::Error;

use crate::documents::DocumentError;
use crate::llm::LlmError;
use crate::scrapers::ScrapeError;

/// Prefix applied to every error message sent to a client.
pub const CLIENT_ERROR_PREFIX: &str = "An error occurred: ";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No input provided. Please enter text, a URL, an image, or a document.")]
    NoInputProvided,

    #[error("Unsupported document type: {0}. Please upload a PDF or DOCX file.")]
    UnsupportedDocumentType(String),

    #[error("Document parsing timed out after {}s", .0.as_secs())]
    ParseTimeout(Duration),

    #[error("Failed to parse document: {0}")]
    DocumentParse(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    ScrapeFailure(String),

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("The model response could not be parsed: {0}")]
    ResultParseFailure(String),
}

impl AnalysisError {
    /// Stable name of the taxonomy member, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::NoInputProvided => "NoInputProvided",
            AnalysisError::UnsupportedDocumentType(_) => "UnsupportedDocumentType",
            AnalysisError::ParseTimeout(_) => "ParseTimeout",
            AnalysisError::DocumentParse(_) => "DocumentParse",
            AnalysisError::InvalidPayload(_) => "InvalidPayload",
            AnalysisError::InvalidUrl(_) => "InvalidUrl",
            AnalysisError::ScrapeFailure(_) => "ScrapeFailure",
            AnalysisError::GenerationFailure(_) => "GenerationFailure",
            AnalysisError::ResultParseFailure(_) => "ResultParseFailure",
        }
    }

    /// Message as shown to the client in the terminal `error` event.
    pub fn client_message(&self) -> String {
        format!("{}{}", CLIENT_ERROR_PREFIX, self)
    }
}

impl From<DocumentError> for AnalysisError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Unsupported(mime) => AnalysisError::UnsupportedDocumentType(mime),
            DocumentError::Timeout(limit) => AnalysisError::ParseTimeout(limit),
            DocumentError::InvalidPayload(msg) => AnalysisError::InvalidPayload(msg),
            other => AnalysisError::DocumentParse(other.to_string()),
        }
    }
}

impl From<ScrapeError> for AnalysisError {
    fn from(err: ScrapeError) -> Self {
        AnalysisError::ScrapeFailure(err.to_string())
    }
}

impl From<LlmError> for AnalysisError {
    fn from(err: LlmError) -> Self {
        AnalysisError::GenerationFailure(err.to_string())
    }
}
