#![allow(dead_code)]

use fenceguard_lib::highlight::{HighlightError, HighlightOptions, Highlighter, LineNumbering, escape_html};
use std::cell::RefCell;

/// A highlight request seen by [`RecordingHighlighter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderCall {
    pub code: String,
    pub language: String,
    pub options: HighlightOptions,
}

/// Highlighter with predictable output that remembers every call
#[derive(Debug, Default)]
pub struct RecordingHighlighter {
    pub renders: RefCell<Vec<RenderCall>>,
    pub stylesheets: RefCell<Vec<String>>,
}

impl RecordingHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// What [`Highlighter::render`] returns for these arguments
    pub fn markup(code: &str, language: &str, line_numbers: LineNumbering) -> String {
        match line_numbers {
            LineNumbering::Off => format!("<code data-lang=\"{language}\">{}</code>", escape_html(code)),
            LineNumbering::From(start) => format!(
                "<code data-lang=\"{language}\" data-start=\"{start}\">{}</code>",
                escape_html(code)
            ),
        }
    }

    pub fn stylesheet_for(language: &str) -> String {
        format!(".{language} .hl-code {{ color: black; }}\n")
    }
}

impl Highlighter for RecordingHighlighter {
    fn render(&self, code: &str, language: &str, options: &HighlightOptions) -> Result<String, HighlightError> {
        self.renders.borrow_mut().push(RenderCall {
            code: code.to_string(),
            language: language.to_string(),
            options: *options,
        });
        Ok(Self::markup(code, language, options.line_numbers))
    }

    fn stylesheet(&self, language: &str) -> Result<String, HighlightError> {
        self.stylesheets.borrow_mut().push(language.to_string());
        Ok(Self::stylesheet_for(language))
    }
}

/// The nested containers a snippet of style target `target` is wrapped in
pub fn wrapped(target: &str, markup: &str) -> String {
    fenceguard_lib::engine::wrap(target, markup)
}
