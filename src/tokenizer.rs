//! Question tokenization
//!
//! The text2sql data is pre-tokenized, so the default tokenizer only has to
//! split on whitespace. Anything fancier can plug in behind the trait.

/// A single question token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

#[derive(Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.split_whitespace().map(Token::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let tokens = WhitespaceTokenizer.tokenize("what  rivers are in state0 ?");
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["what", "rivers", "are", "in", "state0", "?"]);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert!(WhitespaceTokenizer.tokenize("").is_empty());
        assert!(WhitespaceTokenizer.tokenize("   ").is_empty());
    }
}
