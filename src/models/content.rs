//! Normalized model input parts.

/// One unit of model input.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    Binary { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Binary { .. } => None,
        }
    }
}
