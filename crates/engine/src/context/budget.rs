//! Token-budget enforcement.
//!
//! Renders the active window, measures it, and while it is over budget
//! commits the oldest surviving turn to memory and moves the window start
//! past it. Eviction is strict FIFO: no size- or importance-based choice.

use scenewright_core::context::RenderedContext;
use scenewright_core::error::MemoryError;
use scenewright_core::memory::MemorySaver;
use scenewright_core::scene::Dialogue;
use scenewright_core::session::Session;
use scenewright_core::tokenizer::Tokenizer;
use serde::Serialize;
use tracing::{debug, info};

use crate::context::template::{RenderMode, TemplateRenderer};

/// A rendering that fits the budget (or the best one left once the window
/// is exhausted).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fitted {
    pub context: RenderedContext,
    /// Token count of `context`.
    pub tokens: usize,
    /// Turns evicted by this call.
    pub evicted: usize,
}

pub struct BudgetEvictor<'a> {
    tokenizer: &'a dyn Tokenizer,
    memory: &'a dyn MemorySaver,
    budget: usize,
}

impl<'a> BudgetEvictor<'a> {
    pub fn new(tokenizer: &'a dyn Tokenizer, memory: &'a dyn MemorySaver, budget: usize) -> Self {
        Self {
            tokenizer,
            memory,
            budget,
        }
    }

    /// Shrink the active window of `dialogue` until its rendering fits.
    ///
    /// Bounded by the window length. `session.start_index` only moves after
    /// the memory saver accepted the turn; a saver error aborts with the
    /// window unchanged from that turn on. An exhausted window is returned
    /// as is, over budget or not.
    pub async fn fit(
        &self,
        renderer: &TemplateRenderer<'_>,
        dialogue: &Dialogue,
        memory_text: &str,
        session: &mut Session,
    ) -> Result<Fitted, MemoryError> {
        let mut evicted = 0;

        loop {
            let window = dialogue.active_window(session);
            let context = renderer.render(window, memory_text, RenderMode::Continue);
            let tokens = context.count_tokens(self.tokenizer);

            if tokens <= self.budget || session.is_exhausted(dialogue.len()) {
                if evicted > 0 {
                    info!(
                        evicted,
                        start_index = session.start_index,
                        tokens,
                        budget = self.budget,
                        "Evicted turns to fit context budget"
                    );
                }
                return Ok(Fitted {
                    context,
                    tokens,
                    evicted,
                });
            }

            let oldest = &dialogue.turns()[session.start_index];
            debug!(
                turn_id = oldest.id,
                tokens,
                budget = self.budget,
                memory = self.memory.name(),
                "Over budget, evicting oldest turn"
            );
            self.memory.save(oldest).await?;
            session.advance(dialogue.len());
            evicted += 1;
        }
    }
}
