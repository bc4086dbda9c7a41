//! Mapping of backend output onto [`ChatResult`].

use scenewright_core::result::{ChatResult, Usage};
use scenewright_core::scene::Turn;
use scenewright_core::tokenizer::Tokenizer;

/// The raw outcome of a batch call, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    /// Usage as reported by the backend, when it reports any.
    pub usage: Option<Usage>,
}

/// A finished batch exchange.
///
/// Backend-reported usage wins; otherwise the completion is counted with
/// `tokenizer` and added to the fitted prompt count.
pub fn batch_result(
    completion: Completion,
    prompt_tokens: usize,
    tokenizer: &dyn Tokenizer,
) -> ChatResult {
    let usage = match completion.usage {
        Some(usage) => usage,
        None => Usage::from_counts(prompt_tokens, tokenizer.count_tokens(&completion.text)),
    };
    ChatResult {
        scene: Turn::assistant(completion.text),
        usage,
    }
}

/// The result handed back when a stream opens: an empty, unfinished reply
/// whose completion count starts at zero.
pub fn streaming_result(prompt_tokens: usize) -> ChatResult {
    ChatResult {
        scene: Turn::pending_assistant(),
        usage: Usage::from_counts(prompt_tokens, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenewright_core::scene::Role;

    struct Words;

    impl Tokenizer for Words {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn counts_completion_when_backend_is_silent() {
        let result = batch_result(
            Completion {
                text: "three small words".into(),
                usage: None,
            },
            40,
            &Words,
        );
        assert_eq!(result.usage, Usage::from_counts(40, 3));
        assert!(result.scene.done);
        assert_eq!(result.scene.role, Role::Assistant);
    }

    #[test]
    fn reported_usage_wins() {
        let reported = Usage::from_counts(12, 5);
        let result = batch_result(
            Completion {
                text: "anything at all here".into(),
                usage: Some(reported),
            },
            40,
            &Words,
        );
        assert_eq!(result.usage, reported);
    }

    #[test]
    fn stream_result_starts_empty() {
        let result = streaming_result(77);
        assert!(!result.scene.done);
        assert!(result.scene.content.is_empty());
        assert_eq!(result.usage.prompt_tokens, 77);
        assert_eq!(result.usage.completion_tokens, 0);
        assert_eq!(result.usage.total_tokens, 77);
    }
}
