//! Media types accepted by the extractor and base64 payload decoding.

use base64::Engine;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Document formats with a text parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
}

/// Map a document MIME type to a parser kind.
pub fn document_kind(mime: &str) -> Option<DocumentKind> {
    match mime.trim().to_lowercase().as_str() {
        PDF_MIME => Some(DocumentKind::Pdf),
        DOCX_MIME => Some(DocumentKind::Docx),
        _ => None,
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_lowercase().starts_with("image/")
}

/// Split a `data:<mime>;base64,<payload>` URL into its MIME type and payload.
pub fn split_data_url(s: &str) -> Option<(&str, &str)> {
    let rest = s.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.split(';').next().unwrap_or_default();
    if mime.is_empty() || !mime.contains('/') {
        return None;
    }
    Some((mime, payload))
}

/// Decode a standard base64 payload, tolerating a data URL prefix and
/// embedded line breaks.
pub fn decode_base64_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let raw = match split_data_url(payload) {
        Some((_, data)) => data,
        None => payload,
    };
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD.decode(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_kind() {
        assert_eq!(document_kind("application/pdf"), Some(DocumentKind::Pdf));
        assert_eq!(document_kind(DOCX_MIME), Some(DocumentKind::Docx));
        assert_eq!(document_kind("Application/PDF"), Some(DocumentKind::Pdf));
        assert_eq!(document_kind("application/msword"), None);
        assert_eq!(document_kind("text/plain"), None);
    }

    #[test]
    fn test_split_data_url() {
        assert_eq!(
            split_data_url("data:image/png;base64,AAAA"),
            Some(("image/png", "AAAA"))
        );
        assert_eq!(
            split_data_url("data:image/svg+xml;base64,PHN2Zz4="),
            Some(("image/svg+xml", "PHN2Zz4="))
        );
        assert_eq!(split_data_url("AAAA"), None);
        assert_eq!(split_data_url("data:;base64,AAAA"), None);
    }

    #[test]
    fn test_decode_base64_payload() {
        assert_eq!(decode_base64_payload("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(
            decode_base64_payload("data:text/plain;base64,aGVs\nbG8=").unwrap(),
            b"hello"
        );
        assert!(decode_base64_payload("not base64!").is_err());
    }

    #[test]
    fn test_is_image_mime() {
        assert!(is_image_mime("image/jpeg"));
        assert!(!is_image_mime("application/pdf"));
    }
}
