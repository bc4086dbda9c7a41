//! Per-conversation eviction state.

use serde::{Deserialize, Serialize};

/// Mutable state of one conversation.
///
/// `start_index` is the only durable record of which turns have been
/// committed to long-term memory. It never decreases and never exceeds the
/// dialogue length. Callers persist it and serialize exchanges that share it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub start_index: usize,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the window start forward by one turn. Returns false if the window
    /// is already exhausted.
    pub fn advance(&mut self, dialogue_len: usize) -> bool {
        if self.start_index >= dialogue_len {
            return false;
        }
        self.start_index += 1;
        true
    }

    /// Whether every turn of a dialogue of this length has been evicted.
    pub fn is_exhausted(&self, dialogue_len: usize) -> bool {
        self.start_index >= dialogue_len
    }
}
