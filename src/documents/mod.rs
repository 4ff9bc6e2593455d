//! Document text extraction (PDF, DOCX).
//!
//! Parsing is CPU-bound and runs on the blocking pool under a hard timeout so
//! a large or malformed upload cannot stall the request indefinitely.

mod docx;
mod pdf;

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::utils::{decode_base64_payload, document_kind, DocumentKind};

pub use docx::extract_docx_text;
pub use pdf::extract_pdf_text;

/// Default bound on a single parse.
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0}")]
    Unsupported(String),

    #[error("document data: {0}")]
    InvalidPayload(String),

    #[error("parse exceeded {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("PDF: {0}")]
    Pdf(String),

    #[error("DOCX: {0}")]
    Docx(String),

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("parser task failed: {0}")]
    Task(String),
}

/// Converts base64 document payloads into plain text.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    timeout: Duration,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(DEFAULT_PARSE_TIMEOUT)
    }
}

impl DocumentParser {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract the text of a base64-encoded document.
    ///
    /// The MIME type is checked before the payload is decoded. Text is
    /// returned whole, without truncation.
    pub async fn parse(&self, mime_type: &str, base64: &str) -> Result<String, DocumentError> {
        let kind =
            document_kind(mime_type).ok_or_else(|| DocumentError::Unsupported(mime_type.to_string()))?;
        let bytes = decode_base64_payload(base64)
            .map_err(|e| DocumentError::InvalidPayload(e.to_string()))?;

        debug!("Parsing {:?} document ({} bytes)", kind, bytes.len());
        self.parse_bytes(kind, bytes).await
    }

    /// Extract text from raw document bytes.
    pub async fn parse_bytes(
        &self,
        kind: DocumentKind,
        bytes: Vec<u8>,
    ) -> Result<String, DocumentError> {
        let task = tokio::task::spawn_blocking(move || match kind {
            DocumentKind::Pdf => extract_pdf_text(&bytes),
            DocumentKind::Docx => extract_docx_text(&bytes),
        });

        let text = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_err)) if join_err.is_panic() => {
                return Err(match kind {
                    DocumentKind::Pdf => DocumentError::Pdf("malformed document".to_string()),
                    DocumentKind::Docx => DocumentError::Docx("malformed document".to_string()),
                })
            }
            Ok(Err(join_err)) => return Err(DocumentError::Task(join_err.to_string())),
            Err(_) => return Err(DocumentError::Timeout(self.timeout)),
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(DocumentError::NoText);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[tokio::test]
    async fn test_unsupported_type_fails_before_decoding() {
        let err = DocumentParser::default()
            .parse("application/msword", "not even base64 !!")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Unsupported(ref m) if m == "application/msword"));
    }

    #[tokio::test]
    async fn test_bad_base64() {
        let err = DocumentParser::default()
            .parse("application/pdf", "%%%")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_a_parse_error() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"definitely not a pdf");
        let err = DocumentParser::default()
            .parse("application/pdf", &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Pdf(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_garbage_docx_is_a_parse_error() {
        let payload = base64::engine::general_purpose::STANDARD.encode(b"PK but not really");
        let err = DocumentParser::default()
            .parse(crate::utils::DOCX_MIME, &payload)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Docx(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_slow_parse_times_out() {
        let parser = DocumentParser::new(Duration::from_nanos(1));
        let pdf = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".repeat(2_000);

        let err = parser.parse_bytes(DocumentKind::Pdf, pdf).await.unwrap_err();
        assert!(matches!(err, DocumentError::Timeout(d) if d == Duration::from_nanos(1)));
    }
}
