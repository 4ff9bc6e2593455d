//! History records handed to the history sink.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AnalysisResult;

/// Opaque, already-verified identifier of the requesting user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Returns `None` for blank identifiers.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One completed analysis. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub owner_id: OwnerId,
    /// Short description of what was analyzed.
    pub input: String,
    pub response: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(owner_id: OwnerId, input: impl Into<String>, response: AnalysisResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            input: input.into(),
            response,
            created_at: Utc::now(),
        }
    }
}
