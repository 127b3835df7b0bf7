//! Reinsertion filter
//!
//! Last stage of a run: every placeholder of the run's token is swapped for its rendered
//! snippet. Placeholders of other tokens are left alone.

use crate::engine::RenderedSnippets;
use crate::vault::{MatchIndex, RunToken};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

// Paragraph holding nothing but `{token}_{index}`, as left by the vault or rewritten by a sanitizer
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<p>[\t\n\r ]*([0-9a-z]+)_([0-9]{6,})[\t\n\r ]*</p>").unwrap());

/// Substitutes the placeholders of one run
#[derive(Debug, Clone)]
pub struct Reinserter<'r> {
    token: &'r RunToken,
    snippets: &'r RenderedSnippets,
}

impl<'r> Reinserter<'r> {
    pub fn new(token: &'r RunToken, snippets: &'r RenderedSnippets) -> Self {
        Self { token, snippets }
    }

    /// Replace every placeholder of this run in `text` with its rendered snippet.
    ///
    /// Text without such placeholders is returned borrowed.
    pub fn reinsert<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !PLACEHOLDER_REGEX
            .captures_iter(text)
            .any(|caps| self.is_own_token(&caps[1]))
        {
            return Cow::Borrowed(text);
        }

        PLACEHOLDER_REGEX.replace_all(text, |caps: &Captures| self.replacement(caps))
    }

    fn is_own_token(&self, candidate: &str) -> bool {
        candidate.eq_ignore_ascii_case(self.token.as_str())
    }

    fn replacement(&self, caps: &Captures) -> String {
        if !self.is_own_token(&caps[1]) {
            return caps[0].to_string();
        }

        let snippet = caps[2]
            .parse::<usize>()
            .ok()
            .and_then(|index| self.snippets.get(MatchIndex::new(index)));

        match snippet {
            Some(markup) => markup.to_string(),
            None => {
                log::error!(
                    "No rendered snippet for placeholder {}_{}; leaving it in place",
                    &caps[1],
                    &caps[2]
                );
                caps[0].to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fixture() -> (RunToken, RenderedSnippets) {
        let token = RunToken::parse("deadbeef").unwrap();
        let mut snippets = RenderedSnippets::new();
        snippets.insert(MatchIndex::new(0), "<pre>zero</pre>".to_string());
        snippets.insert(MatchIndex::new(1), "<pre>one</pre>".to_string());
        (token, snippets)
    }

    #[test]
    fn test_replaces_own_placeholders() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        let text = format!(
            "a{}b{}c",
            token.placeholder(MatchIndex::new(1)),
            token.placeholder(MatchIndex::new(0))
        );
        assert_eq!(reinserter.reinsert(&text), "a\n<pre>one</pre>\nb\n<pre>zero</pre>\nc");
    }

    #[test]
    fn test_tolerates_rewritten_placeholders() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        assert_eq!(reinserter.reinsert("<P>\n  DEADBEEF_000000 \n</P>"), "<pre>zero</pre>");
    }

    #[test]
    fn test_foreign_tokens_untouched() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        let text = "<p>cafe_000000</p> and <p>deadbeef_000001</p>";
        assert_eq!(reinserter.reinsert(text), "<p>cafe_000000</p> and <pre>one</pre>");
    }

    #[test]
    fn test_text_without_placeholders_is_borrowed() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        let text = "<p>cafe_000000</p> plain <p>text</p>";
        assert!(matches!(reinserter.reinsert(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn test_unresolved_placeholder_stays_visible() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        assert_eq!(reinserter.reinsert("<p>deadbeef_000009</p>"), "<p>deadbeef_000009</p>");
    }

    #[test]
    fn test_only_ascii_digits_and_whitespace_form_placeholders() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        let arabic_indic = "<p>deadbeef_\u{0660}\u{0660}\u{0660}\u{0660}\u{0660}\u{0660}</p>";
        assert!(matches!(reinserter.reinsert(arabic_indic), Cow::Borrowed(_)));
        let no_break_space = "<p>\u{a0}deadbeef_000000</p>";
        assert!(matches!(reinserter.reinsert(no_break_space), Cow::Borrowed(_)));
    }

    #[test]
    fn test_short_index_is_not_a_placeholder() {
        let (token, snippets) = fixture();
        let reinserter = Reinserter::new(&token, &snippets);
        assert_eq!(reinserter.reinsert("<p>deadbeef_00001</p>"), "<p>deadbeef_00001</p>");
    }
}
