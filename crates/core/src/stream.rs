//! Streaming delivery types shared by every streaming backend.

use serde::{Deserialize, Serialize};

/// Lifecycle of one open stream.
///
/// `Idle -> Connecting -> Open -> {Closed | Errored}`. Terminal states are
/// final; a fresh open is required to try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    Connecting,
    Open,
    Closed,
    Errored,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Errored)
    }
}

/// One event delivered to the stream's consumer, in receipt order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental fragment of generated text.
    Delta(String),
    /// The backend signalled the end of the stream.
    Closed,
    /// The connection failed; no further events follow.
    Errored(String),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Delta(_))
    }
}
