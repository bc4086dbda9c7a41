//! # scenewright Core
//!
//! Domain types, traits, and error definitions for scenewright.
//! This crate has **no transport dependencies**: it defines the model that
//! the engine, the backend adapters and the memory sinks implement against.
//!
//! The tokenizer and the memory saver are collaborators: they are consumed
//! through the [`Tokenizer`] and [`MemorySaver`] traits and implemented
//! elsewhere.

pub mod context;
pub mod error;
pub mod memory;
pub mod result;
pub mod scene;
pub mod session;
pub mod stream;
pub mod template;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use context::{RenderTarget, RenderedContext, RenderedMessage};
pub use error::{BackendError, Error, FramingError, MemoryError, Result, StreamError};
pub use memory::MemorySaver;
pub use result::{ChatResult, Usage};
pub use scene::{Dialogue, Role, Turn};
pub use session::Session;
pub use stream::{StreamEvent, StreamState};
pub use template::{Persona, RangeEnd, TemplateEntry};
pub use tokenizer::Tokenizer;
