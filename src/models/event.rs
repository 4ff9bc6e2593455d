//! Events pushed to the client over the per-request channel.

use serde::{Deserialize, Serialize};

/// One framed event. Serializes as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StreamEvent {
    Chunk { text: String },
    Final {},
    Error { message: String },
}

impl StreamEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this event ends the request's event sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final {} | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            serde_json::to_value(StreamEvent::chunk("{\"sum")).unwrap(),
            json!({"type": "chunk", "data": {"text": "{\"sum"}})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::Final {}).unwrap(),
            json!({"type": "final", "data": {}})
        );
        assert_eq!(
            serde_json::to_value(StreamEvent::error("An error occurred: boom")).unwrap(),
            json!({"type": "error", "data": {"message": "An error occurred: boom"}})
        );
    }

    #[test]
    fn test_is_terminal() {
        assert!(!StreamEvent::chunk("x").is_terminal());
        assert!(StreamEvent::Final {}.is_terminal());
        assert!(StreamEvent::error("x").is_terminal());
    }
}
