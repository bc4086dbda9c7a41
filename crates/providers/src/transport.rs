//! HTTP plumbing shared by the backends.

use std::time::Duration;

use scenewright_core::error::BackendError;
use serde::de::DeserializeOwned;
use tracing::{trace, warn};

/// Connect timeout only. A generation may legitimately run for minutes, and
/// an open stream is never timed out here.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .expect("Failed to create HTTP client")
}

/// Send a prepared request and fail on anything outside 2xx.
pub(crate) async fn send_checked(
    request: reqwest::RequestBuilder,
    backend: &str,
) -> Result<reqwest::Response, BackendError> {
    let response = request
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(backend, status = status.as_u16(), body = %error_body, "Backend returned error");
        return Err(BackendError::ApiError {
            status_code: status.as_u16(),
            message: error_body,
        });
    }
    Ok(response)
}

/// Read and decode a JSON body. Decoding failures are malformed responses,
/// not transport failures.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    backend: &str,
) -> Result<T, BackendError> {
    let body = response
        .text()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;
    trace!(backend, body = %body, "Response body");

    serde_json::from_str(&body)
        .map_err(|e| BackendError::MalformedResponse(format!("Failed to parse response: {e}")))
}
