//! Tokenizer trait: the token counter the budget is measured with.
//!
//! Real tokenizers live outside this workspace; the engine crate ships a
//! character heuristic for when none is configured.

/// Counts tokens in a piece of text. Pure: the same text always yields the
/// same count.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Words;

    impl Tokenizer for Words {
        fn count_tokens(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    #[test]
    fn tokenizers_are_object_safe() {
        let tokenizer: Box<dyn Tokenizer> = Box::new(Words);
        assert_eq!(tokenizer.count_tokens("one two three"), 3);
    }
}
