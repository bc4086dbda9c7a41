//! The uniform output of a chat exchange.

use serde::{Deserialize, Serialize};

use crate::scene::Turn;

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn from_counts(prompt_tokens: usize, completion_tokens: usize) -> Self {
        let prompt_tokens = saturate(prompt_tokens);
        let completion_tokens = saturate(completion_tokens);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Accumulate completion tokens as stream deltas arrive.
    pub fn add_completion(&mut self, tokens: usize) {
        self.completion_tokens = self.completion_tokens.saturating_add(saturate(tokens));
        self.total_tokens = self.prompt_tokens.saturating_add(self.completion_tokens);
    }
}

fn saturate(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// A completed (or just-opened) exchange, independent of backend.
///
/// `scene.done` is false when the result was returned at stream open; the
/// text then arrives through the stream's delta events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResult {
    pub scene: Turn,
    pub usage: Usage,
}
