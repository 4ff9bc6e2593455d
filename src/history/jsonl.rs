//! Durable history as one JSON Lines file per owner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use super::{HistoryError, HistorySink};
use crate::models::{AnalysisResult, HistoryEntry, OwnerId};

/// Appends entries to `<dir>/<sha256(owner)>.jsonl`.
pub struct JsonlHistorySink {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistorySink {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// File holding an owner's entries. Owner ids are hashed so arbitrary
    /// identifiers map to safe file names.
    pub fn path_for(&self, owner: &OwnerId) -> PathBuf {
        let digest = Sha256::digest(owner.as_str().as_bytes());
        self.dir.join(format!("{}.jsonl", hex::encode(digest)))
    }
}

#[async_trait]
impl HistorySink for JsonlHistorySink {
    async fn append(
        &self,
        owner: &OwnerId,
        input: &str,
        result: &AnalysisResult,
    ) -> Result<HistoryEntry, HistoryError> {
        let entry = HistoryEntry::new(owner.clone(), input, result.clone());
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(owner))
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(entry)
    }

    async fn recent(
        &self,
        owner: &OwnerId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let content = match tokio::fs::read_to_string(self.path_for(owner)).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in content.lines().rev() {
            if entries.len() >= limit {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable history line: {}", e),
            }
        }
        Ok(entries)
    }
}
