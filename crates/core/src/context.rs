//! The rendered context handed to a backend.
//!
//! Backends consume one of two shapes: a flat prompt (instruct and
//! text-generation APIs) or a role-tagged message list (chat APIs).

use serde::{Deserialize, Serialize};

use crate::scene::Role;
use crate::tokenizer::Tokenizer;

/// Which shape a render produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderTarget {
    Prompt,
    Messages,
}

/// A role + content pair, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub role: Role,
    pub content: String,
}

impl RenderedMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RenderedContext {
    Prompt(String),
    Messages(Vec<RenderedMessage>),
}

impl RenderedContext {
    pub fn target(&self) -> RenderTarget {
        match self {
            Self::Prompt(_) => RenderTarget::Prompt,
            Self::Messages(_) => RenderTarget::Messages,
        }
    }

    /// Token count of the whole context.
    ///
    /// A prompt is counted in one piece; a message list is the sum of each
    /// message's content.
    pub fn count_tokens(&self, tokenizer: &dyn Tokenizer) -> usize {
        match self {
            Self::Prompt(prompt) => tokenizer.count_tokens(prompt),
            Self::Messages(messages) => messages
                .iter()
                .map(|m| tokenizer.count_tokens(&m.content))
                .sum(),
        }
    }

    /// The context as one string, for logging and dry runs.
    pub fn to_text(&self) -> String {
        match self {
            Self::Prompt(prompt) => prompt.clone(),
            Self::Messages(messages) => messages
                .iter()
                .map(|m| format!("[{}] {}", m.role, m.content))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn as_prompt(&self) -> Option<&str> {
        match self {
            Self::Prompt(prompt) => Some(prompt),
            Self::Messages(_) => None,
        }
    }

    pub fn as_messages(&self) -> Option<&[RenderedMessage]> {
        match self {
            Self::Prompt(_) => None,
            Self::Messages(messages) => Some(messages),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chars;

    impl Tokenizer for Chars {
        fn count_tokens(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    #[test]
    fn messages_are_counted_per_content() {
        let ctx = RenderedContext::Messages(vec![
            RenderedMessage::new(Role::System, "abc"),
            RenderedMessage::new(Role::User, "de"),
        ]);
        assert_eq!(ctx.count_tokens(&Chars), 5);
        assert_eq!(ctx.target(), RenderTarget::Messages);
    }

    #[test]
    fn prompt_is_counted_whole() {
        let ctx = RenderedContext::Prompt("abc\nde\n".into());
        assert_eq!(ctx.count_tokens(&Chars), 7);
        assert_eq!(ctx.as_prompt(), Some("abc\nde\n"));
        assert!(ctx.as_messages().is_none());
    }

    #[test]
    fn to_text_tags_roles() {
        let ctx = RenderedContext::Messages(vec![RenderedMessage::new(Role::User, "hi")]);
        assert_eq!(ctx.to_text(), "[user] hi");
    }
}
