//! Fence grammar
//!
//! Recognizes fenced snippets of the form
//! `<pre lang="python" line="3" escaped="true" cssfile="name">BODY</pre>`.
//!
//! Supports:
//! - `lang` / `language` - word characters or hyphen only
//! - `line` / `startLine` - digits, may be empty
//! - `escaped` - `true`, `false` or empty
//! - `cssfile` / `styleTarget` - any token without whitespace, `none` disables wrapping
//!
//! Tag and attribute names are matched case-insensitively. Unrecognized attributes are
//! skipped. The scanner is linear in the input length; bodies above the configured size
//! bound are left in place, unhighlighted.

use std::ops::Range;

/// Tag name used for fences unless configured otherwise
pub const DEFAULT_FENCE_TAG: &str = "pre";

/// Largest body accepted as a fence (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Quoted attribute values longer than this end the attempt to read the tag
const MAX_ATTRIBUTE_BYTES: usize = 1024;

/// Opening tags are never read past this many bytes, so a failed tag costs a bounded amount
const MAX_OPEN_TAG_BYTES: usize = 4 * MAX_ATTRIBUTE_BYTES;

/// Which set of wrapping containers decorates a highlighted snippet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StyleTarget {
    /// No `cssfile`/`styleTarget` attribute: the configured default name
    #[default]
    Default,
    /// `styleTarget="none"`: no wrapping containers at all
    None,
    /// An explicit style target name
    Named(String),
}

impl StyleTarget {
    fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("none") {
            StyleTarget::None
        } else {
            StyleTarget::Named(value.to_string())
        }
    }
}

/// Attributes carried by an opening fence tag
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FenceAttributes {
    /// Language name, lowercased and trimmed (empty when absent)
    pub language: String,
    /// First line number, only present for positive values
    pub start_line: Option<u32>,
    /// Whether the body is HTML-entity escaped
    pub escaped: bool,
    /// Wrapping containers to use
    pub style_target: StyleTarget,
}

/// A fence found in a text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fence<'a> {
    /// Byte range replaced on substitution, including the surrounding whitespace runs
    pub span: Range<usize>,
    /// Parsed attributes of the opening tag
    pub attributes: FenceAttributes,
    /// Body after [`trim_body`]
    pub body: &'a str,
}

/// The snippet grammar: a tag name and a body size bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceGrammar {
    tag: String,
    max_body_bytes: usize,
}

impl Default for FenceGrammar {
    fn default() -> Self {
        Self::new(DEFAULT_FENCE_TAG, DEFAULT_MAX_BODY_BYTES)
    }
}

impl FenceGrammar {
    /// Create a grammar for `<tag ...>BODY</tag>` fences.
    ///
    /// The tag name is compared case-insensitively; configuration validation guarantees it
    /// is a non-empty ASCII word.
    pub fn new(tag: &str, max_body_bytes: usize) -> Self {
        Self {
            tag: tag.trim().to_ascii_lowercase(),
            max_body_bytes,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Lazily iterate over the non-overlapping fences of `text`, in order
    pub fn find_iter<'g, 't>(&'g self, text: &'t str) -> Fences<'g, 't> {
        Fences {
            grammar: self,
            text,
            pos: 0,
            floor: 0,
        }
    }

    /// Locate the first closing tag at or after `from`.
    /// Returns the byte offset of `</` and the offset just past `>`.
    fn find_closing(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        let bytes = text.as_bytes();
        let tag = self.tag.as_bytes();
        let mut search = from;

        while let Some(rel) = text[search..].find("</") {
            let start = search + rel;
            let name_start = start + 2;
            let name_end = name_start + tag.len();
            if name_end <= bytes.len() && bytes[name_start..name_end].eq_ignore_ascii_case(tag) {
                let mut k = name_end;
                while k < bytes.len() && bytes[k].is_ascii_whitespace() {
                    k += 1;
                }
                if bytes.get(k) == Some(&b'>') {
                    return Some((start, k + 1));
                }
            }
            search = name_start;
        }

        None
    }

    /// Check whether the `<` at `open` starts an opening fence tag and return the offset
    /// right after the tag name
    fn opening_name_end(&self, text: &str, open: usize) -> Option<usize> {
        let bytes = text.as_bytes();
        let tag = self.tag.as_bytes();
        let name_start = open + 1;
        let name_end = name_start + tag.len();

        if name_end > bytes.len() || !bytes[name_start..name_end].eq_ignore_ascii_case(tag) {
            return None;
        }

        // `<prefix>` or `<press>` are different tags
        match bytes.get(name_end) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' => Some(name_end),
            _ => None,
        }
    }
}

/// Iterator over the fences of a text, created by [`FenceGrammar::find_iter`]
pub struct Fences<'g, 't> {
    grammar: &'g FenceGrammar,
    text: &'t str,
    /// Where the next search starts
    pos: usize,
    /// End of the previous match; leading whitespace is never consumed before it
    floor: usize,
}

impl<'t> Iterator for Fences<'_, 't> {
    type Item = Fence<'t>;

    fn next(&mut self) -> Option<Fence<'t>> {
        let text = self.text;
        let bytes = text.as_bytes();

        while self.pos < bytes.len() {
            let open = self.pos + text[self.pos..].find('<')?;

            let Some(name_end) = self.grammar.opening_name_end(text, open) else {
                self.pos = open + 1;
                continue;
            };

            let Some((attributes, body_start)) = parse_open_tag(text, name_end) else {
                log::debug!("Skipping <{}> tag at byte {open}: malformed attributes", self.grammar.tag);
                self.pos = open + 1;
                continue;
            };

            // Without a closing tag after this opening tag, no later one can have one either
            let (close_start, close_end) = match self.grammar.find_closing(text, body_start) {
                Some(found) => found,
                None => {
                    self.pos = bytes.len();
                    return None;
                }
            };

            let body = &text[body_start..close_start];
            if body.len() > self.grammar.max_body_bytes {
                log::warn!(
                    "Snippet at byte {open} has a {} byte body (limit {}); leaving it unhighlighted",
                    body.len(),
                    self.grammar.max_body_bytes
                );
                self.pos = close_end;
                continue;
            }

            let mut start = open;
            while start > self.floor && bytes[start - 1].is_ascii_whitespace() {
                start -= 1;
            }
            let mut end = close_end;
            while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                end += 1;
            }

            self.pos = end;
            self.floor = end;

            return Some(Fence {
                span: start..end,
                attributes,
                body: trim_body(body),
            });
        }

        None
    }
}

/// Strip a single leading blank line and all trailing whitespace from a snippet body.
///
/// Indentation of the first code line is significant and kept.
pub fn trim_body(body: &str) -> &str {
    let body = match body.split_once('\n') {
        Some((first, rest)) if first.bytes().all(|b| b.is_ascii_whitespace()) => rest,
        _ => body,
    };
    body.trim_end_matches(|c: char| c.is_ascii_whitespace())
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.')
}

/// Parse the attributes of an opening tag starting right after the tag name.
/// Returns the attributes and the offset just past the closing `>`.
fn parse_open_tag(text: &str, mut i: usize) -> Option<(FenceAttributes, usize)> {
    let mut limit = (i + MAX_OPEN_TAG_BYTES).min(text.len());
    while !text.is_char_boundary(limit) {
        limit -= 1;
    }
    let text = &text[..limit];
    let bytes = text.as_bytes();
    let mut attributes = FenceAttributes::default();

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        match *bytes.get(i)? {
            b'>' => return Some((attributes, i + 1)),
            b'/' | b'<' | b'=' | b'"' | b'\'' => return None,
            _ => {}
        }

        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        if i == name_start {
            return None;
        }
        let name = &text[name_start..i];

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let value = if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let (value, next) = parse_value(text, j)?;
            i = next;
            Some(value)
        } else {
            None
        };

        apply_attribute(&mut attributes, name, value)?;
    }
}

/// Read a quoted or unquoted attribute value at `start`
fn parse_value(text: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    match *bytes.get(start)? {
        quote @ (b'"' | b'\'') => {
            let limit = (start + 1 + MAX_ATTRIBUTE_BYTES).min(bytes.len());
            let close = bytes[start + 1..limit].iter().position(|&b| b == quote)?;
            let end = start + 1 + close;
            Some((&text[start + 1..end], end + 1))
        }
        _ => {
            let mut end = start;
            while end < bytes.len() && !bytes[end].is_ascii_whitespace() && !matches!(bytes[end], b'>' | b'<') {
                end += 1;
            }
            if end == start {
                return None;
            }
            Some((&text[start..end], end))
        }
    }
}

/// Record a recognized attribute. A malformed value for a recognized attribute rejects
/// the whole tag.
fn apply_attribute(attributes: &mut FenceAttributes, name: &str, value: Option<&str>) -> Option<()> {
    match name.to_ascii_lowercase().as_str() {
        "lang" | "language" => {
            let value = value?.trim();
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
                return None;
            }
            attributes.language = value.to_ascii_lowercase();
        }
        "line" | "startline" => {
            let value = value?.trim();
            if !value.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            attributes.start_line = value.parse::<u32>().ok().filter(|n| *n > 0);
        }
        "escaped" => {
            let value = value?.trim();
            attributes.escaped = if value.eq_ignore_ascii_case("true") {
                true
            } else if value.is_empty() || value.eq_ignore_ascii_case("false") {
                false
            } else {
                return None;
            };
        }
        "cssfile" | "styletarget" => {
            let value = value?;
            if value.is_empty() || value.chars().any(char::is_whitespace) {
                return None;
            }
            attributes.style_target = StyleTarget::from_value(value);
        }
        _ => {}
    }
    Some(())
}
