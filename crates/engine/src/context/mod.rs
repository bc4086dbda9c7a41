//! Context assembly: template rendering and token-budget eviction.
//!
//! | Step | Module | Mutates |
//! |------|--------|---------|
//! | Resolve template slots against the active window | [`template`] | nothing |
//! | Render, count, evict oldest turn, repeat | [`budget`] | `Session::start_index`, memory |

pub mod budget;
pub mod template;
pub mod token;

pub use budget::{BudgetEvictor, Fitted};
pub use template::{RenderMode, TemplateRenderer, resolve_range};
pub use token::{HeuristicTokenizer, estimate_tokens};
