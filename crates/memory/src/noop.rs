//! No-op memory sink: evicted turns are simply dropped.

use async_trait::async_trait;
use scenewright_core::error::MemoryError;
use scenewright_core::memory::MemorySaver;
use scenewright_core::scene::Turn;

/// A memory sink that stores nothing.
pub struct NoopMemory;

#[async_trait]
impl MemorySaver for NoopMemory {
    fn name(&self) -> &str {
        "none"
    }

    async fn save(&self, _turn: &Turn) -> Result<(), MemoryError> {
        Ok(())
    }
}
