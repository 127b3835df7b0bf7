//! Token vault
//!
//! Replaces every fence found by the [`FenceGrammar`] with a placeholder and keeps the
//! extracted snippet until the highlight stage consumes it.
//!
//! ## Placeholder Format
//!
//! ```text
//! \n<p>{run token}_{match index, six digits}</p>\n
//! ```
//!
//! The placeholder is the only content of a paragraph element so that it survives
//! sanitizers which keep known elements but rewrite loose text.

use crate::grammar::{FenceGrammar, StyleTarget};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Position of a snippet in discovery order across the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MatchIndex(usize);

impl MatchIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for MatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Random token identifying the placeholders of one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunToken(String);

impl RunToken {
    /// Generate a fresh token of 32 lowercase hex characters
    pub fn generate() -> Self {
        Self(format!("{:032x}", rand::random::<u128>()))
    }

    /// Use a fixed token. Only non-empty ASCII alphanumeric values are accepted.
    pub fn parse(value: &str) -> Option<Self> {
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The text substituted for the snippet at `index`
    pub fn placeholder(&self, index: MatchIndex) -> String {
        format!("\n<p>{}_{}</p>\n", self.0, index)
    }
}

impl fmt::Display for RunToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A snippet taken out of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Index of the placeholder standing in for this snippet
    pub index: MatchIndex,
    /// Language name, lowercased and trimmed
    pub language: String,
    pub start_line: Option<u32>,
    pub escaped: bool,
    pub style_target: StyleTarget,
    /// Trimmed snippet body
    pub body: String,
}

/// Snippets waiting for the highlight stage, in discovery order
pub type PendingBatch = BTreeMap<MatchIndex, RawMatch>;

/// Result of protecting one text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction<'a> {
    /// The text with every fence replaced by its placeholder (borrowed when nothing matched)
    pub text: Cow<'a, str>,
    /// The extracted snippets in order, indexed from the `first_index` given
    pub matches: Vec<RawMatch>,
}

/// Replace every fence of `text` with a placeholder.
///
/// Pure: the only state is `first_index`, the index given to the first match.
pub fn protect<'a>(text: &'a str, token: &RunToken, grammar: &FenceGrammar, first_index: MatchIndex) -> Extraction<'a> {
    let mut matches = Vec::new();
    let mut protected: Option<String> = None;
    let mut last = 0;
    let mut index = first_index;

    for fence in grammar.find_iter(text) {
        let out = protected.get_or_insert_with(|| String::with_capacity(text.len()));
        out.push_str(&text[last..fence.span.start]);
        out.push_str(&token.placeholder(index));
        last = fence.span.end;

        log::debug!(
            "Protected snippet {index} (language '{}', {} bytes)",
            fence.attributes.language,
            fence.body.len()
        );

        matches.push(RawMatch {
            index,
            language: fence.attributes.language,
            start_line: fence.attributes.start_line,
            escaped: fence.attributes.escaped,
            style_target: fence.attributes.style_target,
            body: fence.body.to_string(),
        });
        index = index.next();
    }

    let text = match protected {
        Some(mut out) => {
            out.push_str(&text[last..]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(text),
    };

    Extraction { text, matches }
}

/// Run-scoped store of pending snippets
#[derive(Debug)]
pub struct TokenVault {
    token: RunToken,
    grammar: FenceGrammar,
    pending: PendingBatch,
    next_index: MatchIndex,
}

impl TokenVault {
    /// Start a run with a freshly generated token and an empty batch
    pub fn begin(grammar: FenceGrammar) -> Self {
        Self::with_token(RunToken::generate(), grammar)
    }

    pub fn with_token(token: RunToken, grammar: FenceGrammar) -> Self {
        Self {
            token,
            grammar,
            pending: PendingBatch::new(),
            next_index: MatchIndex::default(),
        }
    }

    pub fn token(&self) -> &RunToken {
        &self.token
    }

    pub fn grammar(&self) -> &FenceGrammar {
        &self.grammar
    }

    pub fn placeholder(&self, index: MatchIndex) -> String {
        self.token.placeholder(index)
    }

    /// Protect `text`, keeping its snippets for the highlight stage.
    ///
    /// Returns the protected text and how many snippets this text contained. Indices keep
    /// increasing across calls.
    pub fn extract_and_protect<'a>(&mut self, text: &'a str) -> (Cow<'a, str>, usize) {
        let extraction = protect(text, &self.token, &self.grammar, self.next_index);
        let found = extraction.matches.len();

        for raw in extraction.matches {
            self.next_index = raw.index.next();
            self.pending.insert(raw.index, raw);
        }

        (extraction.text, found)
    }

    pub fn pending(&self) -> &PendingBatch {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hand the token and the batch over to the highlight stage
    pub fn into_parts(self) -> (RunToken, PendingBatch) {
        (self.token, self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token() -> RunToken {
        RunToken::parse("abc123").unwrap()
    }

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let a = RunToken::generate();
        let b = RunToken::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_begin_starts_empty_with_fresh_token() {
        let first = TokenVault::begin(FenceGrammar::default());
        let second = TokenVault::begin(FenceGrammar::default());
        assert!(first.is_empty());
        assert_eq!(first.token().as_str().len(), 32);
        assert_ne!(first.token(), second.token());
    }

    #[test]
    fn test_parse_rejects_non_alphanumeric() {
        assert!(RunToken::parse("").is_none());
        assert!(RunToken::parse("a_b").is_none());
        assert!(RunToken::parse("a.b").is_none());
    }

    #[test]
    fn test_placeholder_format() {
        assert_eq!(token().placeholder(MatchIndex::new(42)), "\n<p>abc123_000042</p>\n");
    }

    #[test]
    fn test_protect_replaces_span() {
        let text = "Before\n\n<pre lang=\"c\">int x;</pre>\n\nAfter";
        let extraction = protect(text, &token(), &FenceGrammar::default(), MatchIndex::new(5));
        assert_eq!(extraction.text, "Before\n<p>abc123_000005</p>\nAfter");
        assert_eq!(extraction.matches.len(), 1);
        let raw = &extraction.matches[0];
        assert_eq!(raw.index, MatchIndex::new(5));
        assert_eq!(raw.language, "c");
        assert_eq!(raw.body, "int x;");
    }

    #[test]
    fn test_protect_without_fences_borrows() {
        let text = "nothing to see <b>here</b>";
        let extraction = protect(text, &token(), &FenceGrammar::default(), MatchIndex::default());
        assert!(matches!(extraction.text, Cow::Borrowed(_)));
        assert!(extraction.matches.is_empty());
    }

    #[test]
    fn test_indices_continue_across_calls() {
        let mut vault = TokenVault::with_token(token(), FenceGrammar::default());
        let (_, first) = vault.extract_and_protect("<pre>a</pre><pre>b</pre>");
        let (_, none) = vault.extract_and_protect("no code");
        let (text, second) = vault.extract_and_protect("<pre>c</pre>");
        assert_eq!((first, none, second), (2, 0, 1));
        assert_eq!(text, "\n<p>abc123_000002</p>\n");

        let indices: Vec<usize> = vault.pending().keys().map(|i| i.get()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(vault.pending()[&MatchIndex::new(2)].body, "c");
    }
}
