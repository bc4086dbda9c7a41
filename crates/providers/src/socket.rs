//! Event-framed WebSocket streams.
//!
//! On connect the client sends one JSON request frame. The server answers
//! with JSON event frames: `text_stream` carries a fragment, `stream_end`
//! finishes the exchange, anything else is ignored.

use futures::{SinkExt, StreamExt};
use scenewright_core::error::FramingError;
use scenewright_core::stream::{StreamEvent, StreamState};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};

use crate::stream::{EVENT_BUFFER, StateCell, StreamHandle, state_cell, transition};

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Text(String),
    End,
    Ignored(String),
}

#[derive(Debug, Deserialize)]
struct EventFrame {
    event: String,
    #[serde(default)]
    text: Option<String>,
}

pub fn decode_socket_frame(raw: &str) -> Result<SocketEvent, FramingError> {
    let frame: EventFrame = serde_json::from_str(raw).map_err(|e| FramingError::InvalidJson {
        reason: e.to_string(),
    })?;

    match frame.event.as_str() {
        "text_stream" => frame.text.map(SocketEvent::Text).ok_or_else(|| {
            FramingError::UnexpectedShape("text_stream event without text".into())
        }),
        "stream_end" => Ok(SocketEvent::End),
        _ => Ok(SocketEvent::Ignored(frame.event)),
    }
}

/// Connect to `url` in the background and stream its events.
///
/// Returns at once in the `Connecting` state. Connection failures are logged
/// and reported as a single `Errored` event; nothing is retried.
pub fn spawn_socket(url: String, request: serde_json::Value) -> StreamHandle {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let state = state_cell(StreamState::Connecting);

    let task = tokio::spawn(run_socket(url, request, tx, outbound_rx, state.clone()));
    StreamHandle::new(rx, state, Some(outbound_tx), task)
}

async fn run_socket(
    url: String,
    request: serde_json::Value,
    tx: mpsc::Sender<StreamEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    state: StateCell,
) {
    let mut socket = match connect_async(url.as_str()).await {
        Ok((socket, _)) => socket,
        Err(e) => {
            error!(url = %url, error = %e, "Socket connection failed");
            fail(&tx, &state, e.to_string()).await;
            return;
        }
    };
    transition(&state, StreamState::Open);
    debug!(url = %url, "Socket open, sending request frame");

    if let Err(e) = socket.send(Message::Text(request.to_string())).await {
        error!(url = %url, error = %e, "Failed to send request frame");
        fail(&tx, &state, e.to_string()).await;
        return;
    }

    let mut outbound_open = true;
    loop {
        tokio::select! {
            frame = socket.next() => match frame {
                Some(Ok(Message::Text(raw))) => match decode_socket_frame(&raw) {
                    Ok(SocketEvent::Text(text)) => {
                        if tx.send(StreamEvent::Delta(text)).await.is_err() {
                            return; // consumer gone
                        }
                    }
                    Ok(SocketEvent::End) => {
                        if let Err(e) = socket.close(None).await {
                            debug!(error = %e, "Socket close handshake failed");
                        }
                        transition(&state, StreamState::Closed);
                        let _ = tx.send(StreamEvent::Closed).await;
                        return;
                    }
                    Ok(SocketEvent::Ignored(event)) => {
                        trace!(event = %event, "Ignoring socket event");
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping undecodable socket frame");
                    }
                },
                Some(Ok(Message::Close(_))) | None => {
                    warn!(url = %url, "Socket closed before stream_end");
                    transition(&state, StreamState::Closed);
                    let _ = tx.send(StreamEvent::Closed).await;
                    return;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(url = %url, error = %e, "Socket read failed");
                    fail(&tx, &state, e.to_string()).await;
                    return;
                }
            },
            frame = outbound.recv(), if outbound_open => match frame {
                Some(frame) => {
                    if let Err(e) = socket.send(Message::Text(frame)).await {
                        error!(url = %url, error = %e, "Socket write failed");
                        fail(&tx, &state, e.to_string()).await;
                        return;
                    }
                }
                None => outbound_open = false,
            },
        }
    }
}

async fn fail(tx: &mpsc::Sender<StreamEvent>, state: &StateCell, reason: String) {
    transition(state, StreamState::Errored);
    let _ = tx.send(StreamEvent::Errored(reason)).await;
}
