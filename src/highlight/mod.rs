//! Highlighter interface
//!
//! The lexical highlighter is a black box: given code and a language name it produces
//! markup, and on request the stylesheet for that language. [`SyntectHighlighter`] is the
//! backend shipped with the crate.

mod syntect_backend;

pub use syntect_backend::{CLASS_PREFIX, DEFAULT_THEME, SyntectHighlighter};

use std::borrow::Cow;

/// Line numbering requested for a snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineNumbering {
    #[default]
    Off,
    /// Numbered list starting at the given line
    From(u32),
}

impl LineNumbering {
    pub fn from_start_line(start_line: Option<u32>) -> Self {
        match start_line {
            Some(start) => LineNumbering::From(start),
            None => LineNumbering::Off,
        }
    }
}

/// Output options passed with every snippet.
///
/// Numbered output is always an ordered list with one `<pre>` per item, never a table,
/// so numbers cannot drift from their lines on long snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightOptions {
    /// CSS classes instead of inline styles
    pub class_based: bool,
    /// Link keywords to language documentation
    pub keyword_links: bool,
    pub line_numbers: LineNumbering,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            class_based: true,
            keyword_links: false,
            line_numbers: LineNumbering::Off,
        }
    }
}

/// Errors reported by a highlighter backend
#[derive(Debug, thiserror::Error)]
pub enum HighlightError {
    /// The configured theme is not available
    #[error("Unknown highlighting theme '{0}'")]
    UnknownTheme(String),

    /// The backend failed on a snippet
    #[error("Highlighting failed for language '{language}': {message}")]
    Backend { language: String, message: String },

    /// The backend could not produce a stylesheet
    #[error("Failed to generate stylesheet for language '{language}': {message}")]
    Stylesheet { language: String, message: String },
}

/// A syntax highlighter.
///
/// Unknown languages must degrade to plain text rather than fail.
pub trait Highlighter {
    /// Markup for `code` in `language`
    fn render(&self, code: &str, language: &str, options: &HighlightOptions) -> Result<String, HighlightError>;

    /// Complete stylesheet for `language`, usable by every snippet of that language
    fn stylesheet(&self, language: &str) -> Result<String, HighlightError>;
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

const ENTITIES: &[(&str, char)] = &[
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&#039;", '\''),
    ("&#39;", '\''),
    ("&apos;", '\''),
];

/// Reverse HTML special-character escaping of a snippet body.
///
/// `&amp;` is decoded first and the other entities on the result, so a body
/// escaped twice (`&amp;lt;b&amp;gt;`) still comes out as `<b>`.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let ampersands = text.replace("&amp;", "&");
    let mut out = String::with_capacity(ampersands.len());
    let mut rest = ampersands.as_str();
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match ENTITIES.iter().find(|(entity, _)| tail.starts_with(entity)) {
            Some((entity, decoded)) => {
                out.push(*decoded);
                rest = &tail[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Lay out highlighted lines.
///
/// Each line must be balanced markup on its own when numbering is on.
pub(crate) fn layout_lines(container_class: &str, lines: &[String], numbering: LineNumbering) -> String {
    match numbering {
        LineNumbering::Off => format!("<pre class=\"{container_class}\">{}</pre>", lines.join("\n")),
        LineNumbering::From(start) => {
            let mut html = format!("<div class=\"{container_class}\">");
            if start == 1 {
                html.push_str("<ol>");
            } else {
                // Caveat: `start` is not valid in strict XHTML 1.0
                html.push_str(&format!("<ol start=\"{start}\">"));
            }
            if lines.is_empty() {
                html.push_str("<li class=\"li1\"><pre class=\"de1\"></pre></li>");
            }
            for line in lines {
                html.push_str("<li class=\"li1\"><pre class=\"de1\">");
                html.push_str(line);
                html.push_str("</pre></li>");
            }
            html.push_str("</ol></div>");
            html
        }
    }
}

/// Unhighlighted markup for `code`, laid out like highlighted output
pub fn plain_markup(code: &str, language: &str, options: &HighlightOptions) -> String {
    let lines: Vec<String> = code.lines().map(escape_html).collect();
    layout_lines(&escape_html(language), &lines, options.line_numbers)
}
