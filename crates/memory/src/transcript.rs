//! Transcript memory: keeps evicted turns in process, in eviction order.
//!
//! The accumulated [`TranscriptMemory::memory_text`] is what a caller feeds
//! into the memory slot of the next render when no summarizer is wired in.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scenewright_core::error::MemoryError;
use scenewright_core::memory::MemorySaver;
use scenewright_core::scene::{Role, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One evicted turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNote {
    pub turn_id: u64,
    pub role: Role,
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

/// A memory sink that records every evicted turn.
#[derive(Clone)]
pub struct TranscriptMemory {
    notes: Arc<RwLock<Vec<MemoryNote>>>,
}

impl TranscriptMemory {
    pub fn new() -> Self {
        Self {
            notes: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// All notes, oldest first.
    pub async fn notes(&self) -> Vec<MemoryNote> {
        self.notes.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.notes.read().await.len()
    }

    /// The evicted turns joined one per line.
    pub async fn memory_text(&self) -> String {
        self.notes
            .read()
            .await
            .iter()
            .map(|n| n.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub async fn clear(&self) {
        self.notes.write().await.clear();
    }
}

impl Default for TranscriptMemory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemorySaver for TranscriptMemory {
    fn name(&self) -> &str {
        "transcript"
    }

    async fn save(&self, turn: &Turn) -> Result<(), MemoryError> {
        let mut notes = self.notes.write().await;
        if notes.iter().any(|n| n.turn_id == turn.id && turn.id != 0) {
            tracing::debug!(turn_id = turn.id, "Turn already in memory, skipping");
            return Ok(());
        }
        notes.push(MemoryNote {
            turn_id: turn.id,
            role: turn.role,
            content: turn.content.clone(),
            saved_at: Utc::now(),
        });
        Ok(())
    }
}
