//! In-process history, bounded per owner.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{HistoryError, HistorySink};
use crate::models::{AnalysisResult, HistoryEntry, OwnerId};

/// Entries kept per owner when no durable store is configured.
pub const DEFAULT_MEMORY_CAPACITY: usize = 5;

/// Keeps the newest `capacity` entries per owner.
pub struct MemoryHistorySink {
    capacity: usize,
    entries: RwLock<HashMap<OwnerId, VecDeque<HistoryEntry>>>,
}

impl Default for MemoryHistorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemoryHistorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl HistorySink for MemoryHistorySink {
    async fn append(
        &self,
        owner: &OwnerId,
        input: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry::new(owner.clone(), input, result.clone());
        let mut entries = self.entries.write().await;
        let list = entries.entry(owner.clone()).or_default();
        list.push_front(entry.clone());
        list.truncate(self.capacity);
        Ok(entry)
    }

    async fn recent(
        &self,
        owner: &OwnerId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(owner)
            .map(|list| list.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
