//! Backend selection.
//!
//! A profile picks one of four concrete adapters: two wire dialects, each in
//! batch or streaming form. The choice is made once from configuration and
//! never by inspecting responses.

use scenewright_config::{Api, Profile};
use scenewright_core::context::{RenderTarget, RenderedContext};
use scenewright_core::error::BackendError;
use scenewright_core::result::ChatResult;
use scenewright_core::template::Persona;
use scenewright_core::tokenizer::Tokenizer;
use tracing::info;

use crate::normalize::{self, Completion};
use crate::oobabooga::OobaboogaBackend;
use crate::openai_compat::OpenAiCompatBackend;
use crate::stream::StreamHandle;

pub enum Backend {
    OpenAiBatch(OpenAiCompatBackend),
    OpenAiStream(OpenAiCompatBackend),
    OobaboogaBatch(OobaboogaBackend),
    OobaboogaStream(OobaboogaBackend),
}

/// What a dispatch hands back.
pub enum Reply {
    /// A finished batch exchange.
    Complete(ChatResult),
    /// An open stream plus the placeholder result returned at open.
    Streaming(StreamingReply),
}

pub struct StreamingReply {
    pub result: ChatResult,
    pub handle: StreamHandle,
}

impl Reply {
    pub fn result(&self) -> &ChatResult {
        match self {
            Self::Complete(result) => result,
            Self::Streaming(reply) => &reply.result,
        }
    }
}

impl Backend {
    /// Build the adapter a profile asks for.
    ///
    /// The OpenAI dialect needs an API key; the oobabooga dialect takes the
    /// persona's user name for its stop list.
    pub fn from_profile(
        profile: &Profile,
        persona: &Persona,
        api_key: Option<&str>,
    ) -> Result<Self, BackendError> {
        let backend = match profile.api {
            Api::OpenAi => {
                let api_key = api_key.filter(|k| !k.is_empty()).ok_or_else(|| {
                    BackendError::NotConfigured(
                        "openai backend needs an API key (set SCENEWRIGHT_API_KEY)".into(),
                    )
                })?;
                let inner = OpenAiCompatBackend::new(profile.openai.clone(), api_key);
                if profile.stream {
                    Self::OpenAiStream(inner)
                } else {
                    Self::OpenAiBatch(inner)
                }
            }
            Api::Oobabooga => {
                let inner =
                    OobaboogaBackend::new(profile.oobabooga.clone(), persona.user_name.clone());
                if profile.stream {
                    Self::OobaboogaStream(inner)
                } else {
                    Self::OobaboogaBatch(inner)
                }
            }
        };

        info!(backend = backend.name(), streaming = backend.is_streaming(), "Backend selected");
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAiBatch(_) => "openai",
            Self::OpenAiStream(_) => "openai-stream",
            Self::OobaboogaBatch(_) => "oobabooga",
            Self::OobaboogaStream(_) => "oobabooga-stream",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::OpenAiStream(_) | Self::OobaboogaStream(_))
    }

    /// The context shape this backend consumes.
    pub fn render_target(&self) -> RenderTarget {
        match self {
            Self::OpenAiBatch(b) | Self::OpenAiStream(b) if !b.is_instruct() => {
                RenderTarget::Messages
            }
            _ => RenderTarget::Prompt,
        }
    }

    /// Send `context` the way this backend is configured to.
    ///
    /// `prompt_tokens` is the fitted token count; it seeds the usage of the
    /// returned result.
    pub async fn dispatch(
        &self,
        context: &RenderedContext,
        prompt_tokens: usize,
        tokenizer: &dyn Tokenizer,
    ) -> Result<Reply, BackendError> {
        match self {
            Self::OpenAiStream(b) => {
                let handle = b.open_stream(context).await?;
                Ok(streaming(handle, prompt_tokens))
            }
            Self::OobaboogaStream(b) => {
                let handle = b.open_stream(prompt_of(context)?)?;
                Ok(streaming(handle, prompt_tokens))
            }
            Self::OpenAiBatch(_) | Self::OobaboogaBatch(_) => self
                .complete(context, prompt_tokens, tokenizer)
                .await
                .map(Reply::Complete),
        }
    }

    /// One batch exchange, regardless of the streaming setting.
    pub async fn complete(
        &self,
        context: &RenderedContext,
        prompt_tokens: usize,
        tokenizer: &dyn Tokenizer,
    ) -> Result<ChatResult, BackendError> {
        let completion: Completion = match self {
            Self::OpenAiBatch(b) | Self::OpenAiStream(b) => b.complete(context).await?,
            Self::OobaboogaBatch(b) | Self::OobaboogaStream(b) => {
                b.complete(prompt_of(context)?).await?
            }
        };
        Ok(normalize::batch_result(completion, prompt_tokens, tokenizer))
    }
}

fn streaming(handle: StreamHandle, prompt_tokens: usize) -> Reply {
    Reply::Streaming(StreamingReply {
        result: normalize::streaming_result(prompt_tokens),
        handle,
    })
}

fn prompt_of(context: &RenderedContext) -> Result<&str, BackendError> {
    context.as_prompt().ok_or_else(|| {
        BackendError::NotConfigured("oobabooga backend needs a flat prompt, got messages".into())
    })
}
