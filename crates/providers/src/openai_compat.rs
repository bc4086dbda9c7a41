//! OpenAI-compatible backend.
//!
//! Chat models take a `messages` array against `/chat/completions`; models
//! whose name contains `instruct` take a flat `prompt` against
//! `/completions`. Both share the sampling fields and bearer auth, and both
//! stream as `data: <json>` lines.

use futures::StreamExt;
use scenewright_config::OpenAiSettings;
use scenewright_core::context::{RenderedContext, RenderedMessage};
use scenewright_core::error::BackendError;
use scenewright_core::result::Usage;
use scenewright_core::stream::{StreamEvent, StreamState};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::normalize::Completion;
use crate::sse::{DeltaField, SseDecoder, SseFrame};
use crate::stream::{EVENT_BUFFER, StateCell, StreamHandle, state_cell, transition};
use crate::transport::{http_client, read_json, send_checked};

const NAME: &str = "openai";

pub struct OpenAiCompatBackend {
    base_url: String,
    api_key: String,
    settings: OpenAiSettings,
    client: reqwest::Client,
}

impl OpenAiCompatBackend {
    pub fn new(settings: OpenAiSettings, api_key: impl Into<String>) -> Self {
        Self {
            base_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            settings,
            client: http_client(),
        }
    }

    pub fn is_instruct(&self) -> bool {
        self.settings.model.contains("instruct")
    }

    pub fn endpoint(&self) -> String {
        if self.is_instruct() {
            format!("{}/completions", self.base_url)
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    /// The request body for `context`. The context shape decides between
    /// `messages` and `prompt`.
    pub fn request_body<'a>(&'a self, context: &'a RenderedContext, stream: bool) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            frequency_penalty: self.settings.frequency_penalty,
            presence_penalty: self.settings.presence_penalty,
            max_tokens: self.settings.max_tokens,
            stream,
            messages: context.as_messages(),
            prompt: context.as_prompt(),
        }
    }

    fn post(&self, body: &ApiRequest<'_>) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
    }

    /// One blocking exchange.
    pub async fn complete(&self, context: &RenderedContext) -> Result<Completion, BackendError> {
        let body = self.request_body(context, false);
        debug!(
            provider = NAME,
            model = %self.settings.model,
            instruct = self.is_instruct(),
            "Sending completion request"
        );

        let response = send_checked(self.post(&body), NAME).await?;
        let api_response: ApiResponse = read_json(response, NAME).await?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::MalformedResponse("No choices in response".into()))?;

        let text = if self.is_instruct() {
            choice.text
        } else {
            choice.message.map(|m| m.content.unwrap_or_default())
        }
        .ok_or_else(|| BackendError::MalformedResponse("Choice carries no text".into()))?;

        let usage = api_response
            .usage
            .map(|u| Usage::from_counts(u.prompt_tokens, u.completion_tokens));

        Ok(Completion { text, usage })
    }

    /// Start a streaming exchange. Returns once the response headers arrive;
    /// the body is decoded on a background task.
    pub async fn open_stream(&self, context: &RenderedContext) -> Result<StreamHandle, BackendError> {
        let body = self.request_body(context, true);
        debug!(provider = NAME, model = %self.settings.model, "Sending streaming request");

        let state = state_cell(StreamState::Connecting);
        let response =
            send_checked(self.post(&body).header("Accept", "text/event-stream"), NAME).await?;
        transition(&state, StreamState::Open);

        let field = if self.is_instruct() {
            DeltaField::CompletionText
        } else {
            DeltaField::ChatDelta
        };
        Ok(spawn_sse(response, field, state))
    }
}

/// Decode an event-stream body on a background task.
fn spawn_sse(response: reqwest::Response, field: DeltaField, state: StateCell) -> StreamHandle {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let task_state = state.clone();

    let task = tokio::spawn(async move {
        let mut byte_stream = response.bytes_stream();
        let mut decoder = SseDecoder::new(field);

        while let Some(chunk) = byte_stream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(provider = NAME, error = %e, "Stream read failed");
                    transition(&task_state, StreamState::Errored);
                    let _ = tx.send(StreamEvent::Errored(e.to_string())).await;
                    return;
                }
            };

            for frame in decoder.feed(&bytes) {
                match frame {
                    SseFrame::Delta(text) => {
                        if tx.send(StreamEvent::Delta(text)).await.is_err() {
                            return; // consumer gone
                        }
                    }
                    SseFrame::Done => {
                        transition(&task_state, StreamState::Closed);
                        let _ = tx.send(StreamEvent::Closed).await;
                        return;
                    }
                }
            }
        }

        warn!(
            provider = NAME,
            pending = decoder.pending(),
            "Stream ended without [DONE]"
        );
        transition(&task_state, StreamState::Closed);
        let _ = tx.send(StreamEvent::Closed).await;
    });

    StreamHandle::new(rx, state, None, task)
}

// --- Wire types ---

#[derive(Debug, Serialize)]
pub struct ApiRequest<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<&'a [RenderedMessage]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    #[serde(default)]
    message: Option<ApiMessage>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenewright_core::scene::Role;

    fn backend(model: &str) -> OpenAiCompatBackend {
        OpenAiCompatBackend::new(
            OpenAiSettings {
                api_url: "http://localhost:1234/v1/".into(),
                model: model.into(),
                ..OpenAiSettings::default()
            },
            "sk-test",
        )
    }

    #[test]
    fn chat_models_use_chat_endpoint() {
        let b = backend("gpt-3.5-turbo");
        assert!(!b.is_instruct());
        assert_eq!(b.endpoint(), "http://localhost:1234/v1/chat/completions");
    }

    #[test]
    fn instruct_models_use_completions_endpoint() {
        let b = backend("gpt-3.5-turbo-instruct");
        assert!(b.is_instruct());
        assert_eq!(b.endpoint(), "http://localhost:1234/v1/completions");
    }

    #[test]
    fn messages_body_shape() {
        let b = backend("gpt-3.5-turbo");
        let context = RenderedContext::Messages(vec![
            RenderedMessage::new(Role::System, "Be brief."),
            RenderedMessage::new(Role::User, "Hi"),
        ]);
        let body = serde_json::to_value(b.request_body(&context, false)).unwrap();
        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert!(body.get("prompt").is_none());
        assert!((body["presence_penalty"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn prompt_body_shape() {
        let b = backend("gpt-3.5-turbo-instruct");
        let context = RenderedContext::Prompt("Once upon a time\n".into());
        let body = serde_json::to_value(b.request_body(&context, true)).unwrap();
        assert_eq!(body["prompt"], "Once upon a time\n");
        assert_eq!(body["stream"], true);
        assert!(body.get("messages").is_none());
    }
}
