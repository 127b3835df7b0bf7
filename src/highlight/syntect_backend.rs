//! Highlighting with syntect's bundled syntaxes and themes.

use super::{HighlightError, HighlightOptions, Highlighter, escape_html, layout_lines};
use std::sync::LazyLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{
    ClassStyle, IncludeBackground, css_for_theme_with_class_style, line_tokens_to_classed_spans,
    styled_line_to_highlighted_html,
};
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Prefix of every class emitted for a scope
pub const CLASS_PREFIX: &str = "hl-";

/// Theme used unless configured otherwise
pub const DEFAULT_THEME: &str = "InspiredGitHub";

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: CLASS_PREFIX };

/// Highlighter backed by syntect
#[derive(Debug, Clone)]
pub struct SyntectHighlighter {
    theme: &'static Theme,
}

impl SyntectHighlighter {
    pub fn new(theme_name: &str) -> Result<Self, HighlightError> {
        let theme = THEME_SET
            .themes
            .get(theme_name)
            .ok_or_else(|| HighlightError::UnknownTheme(theme_name.to_string()))?;
        Ok(Self { theme })
    }

    /// Names of all bundled themes
    pub fn theme_names() -> Vec<&'static str> {
        THEME_SET.themes.keys().map(String::as_str).collect()
    }

    /// Whether `language` has a dedicated syntax (otherwise plain text is used)
    pub fn supports_language(language: &str) -> bool {
        SYNTAX_SET.find_syntax_by_token(language).is_some()
    }

    fn syntax_for(language: &str) -> &'static SyntaxReference {
        SYNTAX_SET.find_syntax_by_token(language).unwrap_or_else(|| {
            log::debug!("No syntax for language '{language}', using plain text");
            SYNTAX_SET.find_syntax_plain_text()
        })
    }

    /// One balanced markup string per line, using scope classes
    fn classed_lines(code: &str, language: &str, syntax: &SyntaxReference) -> Result<Vec<String>, HighlightError> {
        let mut state = ParseState::new(syntax);
        let mut stack = ScopeStack::new();
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let ops = state
                .parse_line(line, &SYNTAX_SET)
                .map_err(|e| backend_error(language, e))?;
            let content = line.trim_end_matches(['\n', '\r']);
            let ops: Vec<_> = ops.into_iter().map(|(i, op)| (i.min(content.len()), op)).collect();

            // Scopes still open from the previous line are reopened so each line stands alone
            let mut html = String::new();
            for scope in stack.as_slice() {
                open_span(&mut html, *scope);
            }
            let (spans, _) = line_tokens_to_classed_spans(content, &ops, CLASS_STYLE, &mut stack)
                .map_err(|e| backend_error(language, e))?;
            html.push_str(&spans);
            for _ in 0..stack.len() {
                html.push_str("</span>");
            }
            lines.push(html);
        }

        Ok(lines)
    }

    /// One markup string per line, using inline styles from the theme
    fn inline_lines(&self, code: &str, language: &str, syntax: &SyntaxReference) -> Result<Vec<String>, HighlightError> {
        let mut highlighter = HighlightLines::new(syntax, self.theme);
        let mut lines = Vec::new();

        for line in LinesWithEndings::from(code) {
            let regions = highlighter
                .highlight_line(line, &SYNTAX_SET)
                .map_err(|e| backend_error(language, e))?;
            let regions: Vec<_> = regions
                .into_iter()
                .map(|(style, text)| (style, text.trim_end_matches(['\n', '\r'])))
                .collect();
            let html = styled_line_to_highlighted_html(&regions, IncludeBackground::No)
                .map_err(|e| backend_error(language, e))?;
            lines.push(html);
        }

        Ok(lines)
    }
}

impl Highlighter for SyntectHighlighter {
    fn render(&self, code: &str, language: &str, options: &HighlightOptions) -> Result<String, HighlightError> {
        let syntax = Self::syntax_for(language);
        let lines = if options.class_based {
            Self::classed_lines(code, language, syntax)?
        } else {
            self.inline_lines(code, language, syntax)?
        };
        // syntect never links keywords, so `keyword_links` has nothing to switch off
        let container_class = format!("{} {CLASS_PREFIX}code", escape_html(language));
        Ok(layout_lines(&container_class, &lines, options.line_numbers))
    }

    fn stylesheet(&self, language: &str) -> Result<String, HighlightError> {
        let css = css_for_theme_with_class_style(self.theme, CLASS_STYLE).map_err(|e| HighlightError::Stylesheet {
            language: language.to_string(),
            message: e.to_string(),
        })?;
        Ok(scope_stylesheet(&css, language))
    }
}

fn backend_error(language: &str, error: impl std::fmt::Display) -> HighlightError {
    HighlightError::Backend {
        language: language.to_string(),
        message: error.to_string(),
    }
}

fn open_span(html: &mut String, scope: Scope) {
    html.push_str("<span class=\"");
    for (i, atom) in scope.build_string().split('.').enumerate() {
        if i > 0 {
            html.push(' ');
        }
        html.push_str(CLASS_PREFIX);
        html.push_str(atom);
    }
    html.push_str("\">");
}

/// Restrict every rule of a theme stylesheet to snippets of `language`.
///
/// The container rule (`.hl-code`) targets the snippet container itself, every other
/// rule its descendants.
fn scope_stylesheet(css: &str, language: &str) -> String {
    let container = format!(".{CLASS_PREFIX}code");
    let mut scoped = String::new();

    for rule in strip_comments(css).split('}') {
        let Some((selectors, body)) = rule.split_once('{') else {
            continue;
        };
        let selectors: Vec<String> = selectors
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == container {
                    format!(".{language}{s}")
                } else {
                    format!(".{language} {s}")
                }
            })
            .collect();
        if selectors.is_empty() {
            continue;
        }
        scoped.push_str(&selectors.join(", "));
        scoped.push_str(" {");
        scoped.push_str(body.trim_end());
        scoped.push_str("\n}\n");
    }

    scoped
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::LineNumbering;

    fn highlighter() -> SyntectHighlighter {
        SyntectHighlighter::new(DEFAULT_THEME).unwrap()
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_unknown_theme() {
        assert!(matches!(
            SyntectHighlighter::new("no-such-theme"),
            Err(HighlightError::UnknownTheme(_))
        ));
        assert!(SyntectHighlighter::theme_names().contains(&DEFAULT_THEME));
    }

    #[test]
    fn test_python_classed_output() {
        let html = highlighter()
            .render("def f():\n    return 1", "python", &HighlightOptions::default())
            .unwrap();
        assert!(html.starts_with("<pre class=\"python hl-code\">"));
        assert!(html.ends_with("</pre>"));
        assert!(html.contains("hl-keyword"));
        assert!(!html.contains("style="));
        assert_eq!(count(&html, "<span"), count(&html, "</span>"));
    }

    #[test]
    fn test_numbered_lines_are_balanced() {
        let options = HighlightOptions {
            line_numbers: LineNumbering::From(3),
            ..HighlightOptions::default()
        };
        let code = "s = \"\"\"multi\nline string\"\"\"\nx = 1";
        let html = highlighter().render(code, "python", &options).unwrap();
        assert!(html.contains("<ol start=\"3\">"));
        assert_eq!(count(&html, "<li class=\"li1\">"), 3);
        for item in html.split("<li class=\"li1\">").skip(1) {
            let item = item.split("</li>").next().unwrap();
            assert_eq!(count(item, "<span"), count(item, "</span>"), "unbalanced line: {item}");
        }
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        assert!(!SyntectHighlighter::supports_language("no-such-language"));
        let html = highlighter()
            .render("a < b", "no-such-language", &HighlightOptions::default())
            .unwrap();
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn test_inline_style_mode() {
        let options = HighlightOptions {
            class_based: false,
            ..HighlightOptions::default()
        };
        let html = highlighter().render("fn main() {}", "rust", &options).unwrap();
        assert!(html.contains("style="));
    }

    #[test]
    fn test_stylesheet_is_scoped_to_language() {
        let css = highlighter().stylesheet("python").unwrap();
        assert!(!css.is_empty());
        assert!(css.contains(".python.hl-code {"));
        assert!(!css.contains("/*"));
        for line in css.lines().filter(|l| l.ends_with('{')) {
            assert!(line.starts_with(".python"), "unscoped selector: {line}");
        }
    }

    #[test]
    fn test_scope_stylesheet() {
        let css = "/* theme */\n.hl-code {\n color: #000;\n}\n.hl-comment, .hl-string {\n color: #999;\n}\n";
        assert_eq!(
            scope_stylesheet(css, "rust"),
            ".rust.hl-code {\n color: #000;\n}\n.rust .hl-comment, .rust .hl-string {\n color: #999;\n}\n"
        );
    }
}
