//! text-generation-webui ("oobabooga") backend.
//!
//! Batch requests POST the full sampling set plus a stop list and a flat
//! prompt to `{api_url}/v1/generate`. Streaming sends the same body as the
//! first frame of a WebSocket session on `stream_url`.

use scenewright_config::{OobaboogaSampling, OobaboogaSettings};
use scenewright_core::error::BackendError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::Completion;
use crate::socket::spawn_socket;
use crate::stream::StreamHandle;
use crate::transport::{http_client, read_json, send_checked};

const NAME: &str = "oobabooga";

/// Stop sequences sent with every request. The user name is interpolated as
/// `\n<name>:` and `\n<name> `. The streaming list also stops at
/// `### Response`.
pub fn stop_sequences(user_name: &str, streaming: bool) -> Vec<String> {
    let mut stops: Vec<String> = [
        "### INPUT",
        "### Input",
        "### User",
        "### USER",
        "### INSTRUCTION",
        "### Instruction",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    if streaming {
        stops.push("### Response".into());
    }

    stops.extend(
        ["\n```", "\nUser:", "\nuser:", "\n<|user|>"]
            .into_iter()
            .map(String::from),
    );
    stops.push(format!("\n{user_name}:"));
    stops.push(format!("\n{user_name} "));
    stops
}

pub struct OobaboogaBackend {
    api_url: String,
    stream_url: String,
    sampling: OobaboogaSampling,
    user_name: String,
    client: reqwest::Client,
}

impl OobaboogaBackend {
    pub fn new(settings: OobaboogaSettings, user_name: impl Into<String>) -> Self {
        Self {
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            stream_url: settings.stream_url,
            sampling: settings.sampling,
            user_name: user_name.into(),
            client: http_client(),
        }
    }

    pub fn request_body<'a>(&'a self, prompt: &'a str, streaming: bool) -> GenerateRequest<'a> {
        GenerateRequest {
            sampling: &self.sampling,
            stop: stop_sequences(&self.user_name, streaming),
            prompt,
        }
    }

    pub async fn complete(&self, prompt: &str) -> Result<Completion, BackendError> {
        let url = format!("{}/v1/generate", self.api_url);
        debug!(provider = NAME, url = %url, prompt_len = prompt.len(), "Sending generate request");

        let request = self.client.post(&url).json(&self.request_body(prompt, false));
        let response = send_checked(request, NAME).await?;
        let generated: GenerateResponse = read_json(response, NAME).await?;

        let text = generated
            .results
            .into_iter()
            .next()
            .map(|r| r.text)
            .ok_or_else(|| BackendError::MalformedResponse("No results in response".into()))?;

        Ok(Completion { text, usage: None })
    }

    /// Open the socket session. Returns immediately; connection failures
    /// arrive as an `Errored` event.
    pub fn open_stream(&self, prompt: &str) -> Result<StreamHandle, BackendError> {
        let frame = serde_json::to_value(self.request_body(prompt, true))
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;
        debug!(provider = NAME, url = %self.stream_url, "Opening stream socket");
        Ok(spawn_socket(self.stream_url.clone(), frame))
    }
}

// --- Wire types ---

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    #[serde(flatten)]
    pub sampling: &'a OobaboogaSampling,
    pub stop: Vec<String>,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    results: Vec<GenerateResult>,
}

#[derive(Debug, Deserialize)]
struct GenerateResult {
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_stop_list_is_exact() {
        let stops = stop_sequences("Alice", false);
        assert_eq!(
            stops,
            vec![
                "### INPUT",
                "### Input",
                "### User",
                "### USER",
                "### INSTRUCTION",
                "### Instruction",
                "\n```",
                "\nUser:",
                "\nuser:",
                "\n<|user|>",
                "\nAlice:",
                "\nAlice ",
            ]
        );
    }

    #[test]
    fn stream_stop_list_adds_response_marker() {
        let stops = stop_sequences("Alice", true);
        assert_eq!(stops.len(), 13);
        assert_eq!(stops[6], "### Response");
        assert_eq!(stops.iter().filter(|s| s.contains("Alice")).count(), 2);
    }

    #[test]
    fn body_flattens_sampling_parameters() {
        let backend = OobaboogaBackend::new(OobaboogaSettings::default(), "Bob");
        let body = serde_json::to_value(backend.request_body("Hello\n", false)).unwrap();
        assert_eq!(body["prompt"], "Hello\n");
        assert_eq!(body["max_new_tokens"], 300);
        assert_eq!(body["seed"], -1);
        assert_eq!(body["truncation_length"], 2048);
        assert_eq!(body["do_sample"], true);
        assert_eq!(body["stop"][10], "\nBob:");
        assert!(body.get("sampling").is_none());
        assert!(body.get("stream_url").is_none());
    }
}
