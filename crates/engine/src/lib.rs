//! Context assembly and dispatch for scenewright.
//!
//! [`ChatEngine`] fits a dialogue into a profile's token budget through the
//! template renderer and budget evictor, then sends the result through a
//! [`scenewright_providers::Backend`].

pub mod context;
pub mod exchange;

pub use context::{
    BudgetEvictor, Fitted, HeuristicTokenizer, RenderMode, TemplateRenderer, estimate_tokens,
};
pub use exchange::{ChatEngine, ChatSetup, Exchange};
