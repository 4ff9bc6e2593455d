//! Shared utility functions.
//!
//! - `text`: whitespace collapsing, character-bounded truncation, entity decoding
//! - `mime`: supported media types and base64 / data URL payload handling

mod mime;
mod text;

pub use mime::{
    decode_base64_payload, document_kind, is_image_mime, split_data_url, DocumentKind, DOCX_MIME,
    PDF_MIME,
};
pub use text::{collapse_whitespace, decode_xml_entities, truncate_chars};
