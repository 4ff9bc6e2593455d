//! PDF text extraction.

use super::DocumentError;

/// Extract the text layer of an in-memory PDF.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))
}
