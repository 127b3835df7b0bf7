//! Highlight & stylesheet engine
//!
//! Consumes the pending batch of a run in discovery order: every snippet is highlighted,
//! every language contributes its stylesheet exactly once, and every style target asks for
//! its stylesheet asset.

use crate::grammar::StyleTarget;
use crate::highlight::{HighlightOptions, Highlighter, LineNumbering, decode_entities, escape_html, plain_markup};
use crate::vault::{MatchIndex, PendingBatch, RawMatch};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// Language used for snippets without a language
pub const PLAIN_LANGUAGE: &str = "text";

/// Style target used when a snippet names none
pub const DEFAULT_STYLE_TARGET: &str = "fenceguard";

/// Class suffixes of the wrapping containers, outermost first
pub const WRAPPER_SUFFIXES: [&str; 6] = ["-wrap5", "-wrap4", "-wrap3", "-wrap2", "-wrap", ""];

/// Settings of the highlight stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Style target for snippets without an explicit one
    pub default_style_target: String,
    /// Language name substitutions, applied after lowercasing
    pub language_aliases: BTreeMap<String, String>,
    /// CSS classes instead of inline styles
    pub class_based: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_style_target: DEFAULT_STYLE_TARGET.to_string(),
            language_aliases: BTreeMap::new(),
            class_based: true,
        }
    }
}

impl EngineSettings {
    /// Normalized language name: lowercased, trimmed, aliased, `text` when empty
    pub fn resolve_language(&self, language: &str) -> String {
        let language = language.trim().to_lowercase();
        if language.is_empty() {
            return PLAIN_LANGUAGE.to_string();
        }
        match self.language_aliases.get(&language) {
            Some(alias) => alias.trim().to_lowercase(),
            None => language,
        }
    }

    /// Name of the wrapping containers for `target`, `None` when wrapping is disabled
    pub fn style_target_name<'a>(&'a self, target: &'a StyleTarget) -> Option<&'a str> {
        match target {
            StyleTarget::None => None,
            StyleTarget::Default => Some(self.default_style_target.as_str()),
            StyleTarget::Named(name) => Some(name.as_str()),
        }
    }
}

/// Final markup per snippet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSnippets {
    markup: BTreeMap<MatchIndex, String>,
}

impl RenderedSnippets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: MatchIndex, markup: String) {
        self.markup.insert(index, markup);
    }

    pub fn get(&self, index: MatchIndex) -> Option<&str> {
        self.markup.get(&index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MatchIndex, &str)> {
        self.markup.iter().map(|(index, markup)| (*index, markup.as_str()))
    }
}

/// Languages that already contributed their stylesheet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageStyleSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl LanguageStyleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `language`; returns true the first time it is seen
    pub fn insert(&mut self, language: &str) -> bool {
        if self.seen.contains(language) {
            return false;
        }
        self.seen.insert(language.to_string());
        self.order.push(language.to_string());
        true
    }

    pub fn contains(&self, language: &str) -> bool {
        self.seen.contains(language)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Languages in the order they were first seen
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

/// Style target assets in request order, duplicates included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssAssetRequestList {
    requests: Vec<String>,
}

impl CssAssetRequestList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &str) {
        self.requests.push(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.requests.iter().map(String::as_str)
    }

    /// Requested names without duplicates, in order of first request
    pub fn unique(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter().filter(|name| seen.insert(*name)).collect()
    }
}

/// Everything the highlight stage produces for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutput {
    pub snippets: RenderedSnippets,
    /// Aggregated stylesheet, one block per language
    pub stylesheet: String,
    pub css_requests: CssAssetRequestList,
    pub languages: LanguageStyleSet,
}

/// Highlight every pending snippet, in index order.
///
/// Never skips an entry: when the highlighter fails the snippet is rendered as escaped
/// plain text.
pub fn process_batch(batch: PendingBatch, highlighter: &dyn Highlighter, settings: &EngineSettings) -> BatchOutput {
    let mut output = BatchOutput::default();

    for (index, raw) in batch {
        let markup = render_snippet(&raw, highlighter, settings, &mut output);
        output.snippets.insert(index, markup);
    }

    log::debug!(
        "Highlighted {} snippets in {} languages, {} stylesheet bytes",
        output.snippets.len(),
        output.languages.len(),
        output.stylesheet.len()
    );

    output
}

fn render_snippet(raw: &RawMatch, highlighter: &dyn Highlighter, settings: &EngineSettings, output: &mut BatchOutput) -> String {
    let language = settings.resolve_language(&raw.language);
    let code = if raw.escaped {
        decode_entities(&raw.body)
    } else {
        Cow::Borrowed(raw.body.as_str())
    };

    let options = HighlightOptions {
        class_based: settings.class_based,
        keyword_links: false,
        line_numbers: LineNumbering::from_start_line(raw.start_line),
    };

    let markup = highlighter.render(&code, &language, &options).unwrap_or_else(|e| {
        log::error!("Snippet {}: {e}; rendering it unhighlighted", raw.index);
        plain_markup(&code, &language, &options)
    });

    if output.languages.insert(&language) {
        match highlighter.stylesheet(&language) {
            Ok(css) => output.stylesheet.push_str(&css),
            Err(e) => log::error!("{e}"),
        }
    }

    match settings.style_target_name(&raw.style_target) {
        Some(target) => {
            output.css_requests.push(target);
            wrap(target, &markup)
        }
        None => markup,
    }
}

/// Surround `markup` with the nested containers of style target `target`
pub fn wrap(target: &str, markup: &str) -> String {
    let target = escape_html(target);
    let mut html = String::from("\n\n");
    for suffix in WRAPPER_SUFFIXES {
        html.push_str(&format!("<div class=\"{target}{suffix}\">"));
    }
    html.push_str(markup);
    for _ in WRAPPER_SUFFIXES {
        html.push_str("</div>");
    }
    html.push_str("\n\n");
    html
}
