//! Chat backend adapters for scenewright.
//!
//! Two wire dialects are supported, each in batch and streaming form:
//! OpenAI-compatible chat/completions (streamed as `data:` lines) and the
//! text-generation-webui generate API (streamed over a WebSocket).
//! [`Backend`] selects one from a profile; every adapter's output is
//! normalized into a `ChatResult`.

pub mod normalize;
pub mod oobabooga;
pub mod openai_compat;
pub mod router;
pub mod socket;
pub mod sse;
pub mod stream;
mod transport;

pub use normalize::{Completion, batch_result, streaming_result};
pub use oobabooga::{OobaboogaBackend, stop_sequences};
pub use openai_compat::OpenAiCompatBackend;
pub use router::{Backend, Reply, StreamingReply};
pub use sse::{DeltaField, SseDecoder, SseFrame};
pub use stream::StreamHandle;
