//! `scenewright render`: Dry run: fit the context and print it.

use scenewright_core::context::RenderTarget;
use scenewright_core::scene::{Dialogue, Role};
use scenewright_core::session::Session;
use scenewright_engine::{ChatEngine, ChatSetup};
use scenewright_memory::NoopMemory;
use std::sync::Arc;

pub async fn run(
    message: String,
    profile: Option<String>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, profile) = super::load_profile(profile.as_deref())?;
    let target = if profile.uses_flat_prompt() {
        RenderTarget::Prompt
    } else {
        RenderTarget::Messages
    };

    // Nothing is committed to memory on a dry run
    let engine = ChatEngine::with_memory(Arc::new(NoopMemory));
    let mut dialogue = Dialogue::new();
    dialogue.push(Role::User, message);
    let mut session = Session::new();
    let setup = ChatSetup {
        profile: &profile,
        persona: &config.persona,
        memory_text: "",
    };

    let fitted = engine.prepare(setup, target, &dialogue, &mut session).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&fitted)?);
    } else {
        println!("{}", fitted.context.to_text());
        eprintln!();
        eprintln!(
            "  {} tokens of {} (api: {}, evicted: {})",
            fitted.tokens,
            profile.context_budget(),
            profile.api,
            fitted.evicted
        );
    }
    Ok(())
}
