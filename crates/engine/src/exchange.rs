//! One chat exchange: fit the context, then hand it to the backend.

use std::sync::Arc;

use scenewright_config::Profile;
use scenewright_core::context::RenderTarget;
use scenewright_core::error::{MemoryError, Result};
use scenewright_core::memory::MemorySaver;
use scenewright_core::result::ChatResult;
use scenewright_core::scene::{Dialogue, Turn};
use scenewright_core::session::Session;
use scenewright_core::template::Persona;
use scenewright_core::tokenizer::Tokenizer;
use scenewright_providers::{Backend, Reply};
use tracing::{debug, info};

use crate::context::{BudgetEvictor, Fitted, HeuristicTokenizer, RenderMode, TemplateRenderer};

/// The fixed inputs of an exchange.
#[derive(Debug, Clone, Copy)]
pub struct ChatSetup<'a> {
    pub profile: &'a Profile,
    pub persona: &'a Persona,
    /// Current long-term memory text, fed to the memory slot.
    pub memory_text: &'a str,
}

/// What [`ChatEngine::send`] returns.
pub struct Exchange {
    pub reply: Reply,
    /// Turns evicted while fitting this exchange.
    pub evicted: usize,
}

/// Drives the budget evictor and the backend with shared collaborators.
///
/// The engine holds no session state. Callers own `Session` and must not
/// run two exchanges on the same session at once.
#[derive(Clone)]
pub struct ChatEngine {
    tokenizer: Arc<dyn Tokenizer>,
    memory: Arc<dyn MemorySaver>,
}

impl ChatEngine {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, memory: Arc<dyn MemorySaver>) -> Self {
        Self { tokenizer, memory }
    }

    /// An engine that counts tokens with the character heuristic.
    pub fn with_memory(memory: Arc<dyn MemorySaver>) -> Self {
        Self::new(Arc::new(HeuristicTokenizer), memory)
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Fit the active window into the profile's budget without sending.
    pub async fn prepare(
        &self,
        setup: ChatSetup<'_>,
        target: RenderTarget,
        dialogue: &Dialogue,
        session: &mut Session,
    ) -> std::result::Result<Fitted, MemoryError> {
        let renderer = TemplateRenderer::for_profile(setup.profile, setup.persona, target);
        let evictor = BudgetEvictor::new(
            self.tokenizer.as_ref(),
            self.memory.as_ref(),
            setup.profile.context_budget(),
        );
        evictor
            .fit(&renderer, dialogue, setup.memory_text, session)
            .await
    }

    /// Fit, then dispatch.
    ///
    /// Memory-saver failures abort before anything is sent. Backend failures
    /// are returned as is; nothing is retried.
    pub async fn send(
        &self,
        setup: ChatSetup<'_>,
        backend: &Backend,
        dialogue: &Dialogue,
        session: &mut Session,
    ) -> Result<Exchange> {
        let fitted = self
            .prepare(setup, backend.render_target(), dialogue, session)
            .await?;
        debug!(
            backend = backend.name(),
            target = ?fitted.context.target(),
            tokens = fitted.tokens,
            start_index = session.start_index,
            "Context fitted"
        );

        let reply = backend
            .dispatch(&fitted.context, fitted.tokens, self.tokenizer.as_ref())
            .await?;
        if let Reply::Complete(result) = &reply {
            info!(
                backend = backend.name(),
                prompt_tokens = result.usage.prompt_tokens,
                completion_tokens = result.usage.completion_tokens,
                "Exchange complete"
            );
        }

        Ok(Exchange {
            reply,
            evicted: fitted.evicted,
        })
    }

    /// Ask the backend to condense `turns`.
    ///
    /// Renders in summary mode (no template, no eviction) and always uses a
    /// batch request. The reply text is the summary; storing it is up to the
    /// caller.
    pub async fn summarize(
        &self,
        setup: ChatSetup<'_>,
        backend: &Backend,
        turns: &[Turn],
    ) -> Result<ChatResult> {
        let renderer =
            TemplateRenderer::for_profile(setup.profile, setup.persona, backend.render_target());
        let context = renderer.render(turns, setup.memory_text, RenderMode::Summary);
        let tokens = context.count_tokens(self.tokenizer.as_ref());
        debug!(backend = backend.name(), turns = turns.len(), tokens, "Requesting summary");

        let result = backend
            .complete(&context, tokens, self.tokenizer.as_ref())
            .await?;
        Ok(result)
    }
}
