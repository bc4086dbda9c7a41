//! Long-term memory sinks for scenewright.
//!
//! Every sink implements `scenewright_core::MemorySaver`. Condensing evicted
//! turns into prose is a caller concern; these sinks keep the raw turns.

pub mod noop;
pub mod transcript;

pub use noop::NoopMemory;
pub use transcript::{MemoryNote, TranscriptMemory};

use std::sync::Arc;

use scenewright_core::MemorySaver;

/// Build a memory sink by its configured name.
///
/// Unknown names fall back to the transcript sink.
pub fn from_name(name: &str) -> Arc<dyn MemorySaver> {
    match name {
        "none" | "noop" => Arc::new(NoopMemory),
        "transcript" => Arc::new(TranscriptMemory::new()),
        other => {
            tracing::warn!(backend = other, "Unknown memory backend, using transcript");
            Arc::new(TranscriptMemory::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_by_name() {
        assert_eq!(from_name("none").name(), "none");
        assert_eq!(from_name("transcript").name(), "transcript");
        assert_eq!(from_name("sqlite").name(), "transcript");
    }
}
