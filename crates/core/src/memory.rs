//! Memory trait: where turns go when they fall out of the context window.
//!
//! The saver receives each evicted turn, oldest first, and is awaited before
//! the session's window start moves past it. How evicted turns are condensed
//! into the memory text that later fills the memory slot is up to the
//! implementation.

use async_trait::async_trait;

use crate::error::MemoryError;
use crate::scene::Turn;

#[async_trait]
pub trait MemorySaver: Send + Sync {
    /// The saver name (e.g., "transcript", "none").
    fn name(&self) -> &str;

    /// Commit an evicted turn to long-term memory.
    ///
    /// An error aborts the exchange and leaves the turn in the window.
    async fn save(&self, turn: &Turn) -> std::result::Result<(), MemoryError>;
}
