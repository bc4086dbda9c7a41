//! `scenewright chat`: Send one message and print the reply.

use std::io::Write;

use scenewright_core::scene::{Dialogue, Role};
use scenewright_core::session::Session;
use scenewright_core::stream::StreamState;
use scenewright_engine::{ChatEngine, ChatSetup};
use scenewright_providers::{Backend, Reply};

pub async fn run(
    message: String,
    profile: Option<String>,
    stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut profile) = super::load_profile(profile.as_deref())?;
    if stream {
        profile.stream = true;
    }

    let backend = Backend::from_profile(&profile, &config.persona, config.api_key.as_deref())?;
    let engine = ChatEngine::with_memory(scenewright_memory::from_name(&config.memory.backend));

    let mut dialogue = Dialogue::new();
    dialogue.push(Role::User, message);
    let mut session = Session::new();
    let setup = ChatSetup {
        profile: &profile,
        persona: &config.persona,
        memory_text: "",
    };

    let exchange = engine.send(setup, &backend, &dialogue, &mut session).await?;
    if exchange.evicted > 0 {
        eprintln!("  ({} turns moved to memory)", exchange.evicted);
    }

    match exchange.reply {
        Reply::Complete(result) => {
            println!("{}", result.scene.content);
            eprintln!(
                "  [{} prompt + {} completion = {} tokens]",
                result.usage.prompt_tokens, result.usage.completion_tokens, result.usage.total_tokens
            );
        }
        Reply::Streaming(reply) => {
            let mut scene = reply.result.scene;
            let mut usage = reply.result.usage;
            let tokenizer = engine.tokenizer();
            let mut closed = false;

            let state = reply
                .handle
                .drive(
                    |delta| {
                        scene.push_delta(delta);
                        usage.add_completion(tokenizer.count_tokens(delta));
                        print!("{delta}");
                        let _ = std::io::stdout().flush();
                    },
                    || closed = true,
                )
                .await;
            println!();

            if closed {
                scene.finish();
            }
            tracing::debug!(chars = scene.content.len(), done = scene.done, "Reply received");

            if state == StreamState::Errored {
                return Err("Stream failed before completion".into());
            }
            eprintln!(
                "  [{} prompt + ~{} completion = ~{} tokens]",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
    }

    Ok(())
}
