//! Link labels, destinations, titles and reference definitions.
//!
//! Every scanner works on byte offsets into a leaf's inline buffer and returns the
//! offset just past what it recognized.

use unicode_casefold::UnicodeCaseFold;

use crate::entity::unescape;
use crate::line::is_space_or_tab;

/// Case folds a label and collapses its whitespace, the form labels are matched in.
pub fn normalize_label(label: &str) -> String {
    let folded: String = label.chars().case_fold().collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether bracketed link text can double as a reference label.
pub fn is_valid_label(raw: &str, max_length: usize) -> bool {
    if raw.len() > max_length || normalize_label(raw).is_empty() {
        return false;
    }
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'[' | b']' => return false,
            _ => i += 1,
        }
    }
    true
}

/// Scans `[label]` at `start`. Returns the raw label text and the offset after `]`.
pub fn scan_link_label(text: &str, start: usize, max_length: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'[') {
        return None;
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 1;
                if bytes.get(i).is_some_and(u8::is_ascii_punctuation) {
                    i += 1;
                }
            }
            b'[' => return None,
            b']' => return Some((&text[start + 1..i], i + 1)),
            _ => i += 1,
        }
        if i - start - 1 > max_length {
            return None;
        }
    }
    None
}

/// Skips spaces and tabs with at most one line ending among them.
pub fn skip_spnl(text: &str, mut i: usize) -> usize {
    let bytes = text.as_bytes();
    let mut newline_seen = false;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'\n' if !newline_seen => {
                newline_seen = true;
                i += 1;
            }
            _ => break,
        }
    }
    i
}

/// A scanned destination: raw text, whether it was written in `<...>`, and its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination<'a> {
    pub raw: &'a str,
    pub pointy: bool,
    pub end: usize,
}

/// Scans a link destination at `start`, either `<...>` or a run without spaces or
/// control characters and with balanced parentheses.
///
/// An empty run is only accepted right before `)`.
pub fn scan_link_destination(text: &str, start: usize, max_parens: usize) -> Option<Destination<'_>> {
    let bytes = text.as_bytes();
    if bytes.get(start) == Some(&b'<') {
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => {
                    return Some(Destination {
                        raw: &text[start + 1..i],
                        pointy: true,
                        end: i + 1,
                    });
                }
                b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
                b'\n' | b'<' => return None,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = start;
    let mut parens = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'(' => {
                parens += 1;
                if parens > max_parens {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if parens == 0 {
                    break;
                }
                parens -= 1;
                i += 1;
            }
            b if b <= b' ' || b == 0x7f => break,
            _ => i += 1,
        }
    }
    if parens != 0 || (i == start && bytes.get(i) != Some(&b')')) {
        return None;
    }
    Some(Destination {
        raw: &text[start..i],
        pointy: false,
        end: i,
    })
}

/// Scans a `"title"`, `'title'` or `(title)` at `start`. Returns the raw content and the
/// offset after the closing quote.
pub fn scan_link_title(text: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let close = match bytes.get(start)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 1;
                if bytes.get(i).is_some_and(u8::is_ascii_punctuation) {
                    i += 1;
                }
            }
            b if b == close => return Some((&text[start + 1..i], i + 1)),
            b'(' if close == b')' => return None,
            _ => i += 1,
        }
    }
    None
}

/// The `(destination "title")` part of an inline link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineLink {
    pub url: String,
    pub title: Option<String>,
    pub end: usize,
}

/// Parses an inline link tail starting at the `(` found at `start`.
pub fn parse_inline_link(text: &str, start: usize, max_parens: usize) -> Option<InlineLink> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'(') {
        return None;
    }
    let i = skip_spnl(text, start + 1);
    let destination = scan_link_destination(text, i, max_parens)?;
    let mut i = destination.end;
    let before_title = i;
    i = skip_spnl(text, i);
    let mut title = None;
    if i > before_title
        && let Some((raw, end)) = scan_link_title(text, i)
    {
        title = Some(unescape(raw));
        i = skip_spnl(text, end);
    }
    if bytes.get(i) != Some(&b')') {
        return None;
    }
    Some(InlineLink {
        url: unescape(destination.raw),
        title,
        end: i + 1,
    })
}

/// A link reference definition recognized at the start of a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDefinition {
    pub label: String,
    pub url: String,
    pub title: Option<String>,
    /// Bytes consumed, including the final line ending when there is one.
    pub len: usize,
}

/// Offset after trailing spaces and one line ending, if nothing else is left on the line.
fn line_end_after(text: &str, mut i: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    while i < bytes.len() && is_space_or_tab(bytes[i]) {
        i += 1;
    }
    match bytes.get(i) {
        None => Some(i),
        Some(b'\n') => Some(i + 1),
        Some(_) => None,
    }
}

/// Parses one `[label]: destination "title"` definition at the start of `text`.
pub fn parse_reference_definition(
    text: &str,
    max_label_length: usize,
    max_parens: usize,
) -> Option<ParsedDefinition> {
    let (label, mut i) = scan_link_label(text, 0, max_label_length)?;
    if normalize_label(label).is_empty() || text.as_bytes().get(i) != Some(&b':') {
        return None;
    }
    i = skip_spnl(text, i + 1);

    let destination = scan_link_destination(text, i, max_parens)?;
    if destination.raw.is_empty() && !destination.pointy {
        return None;
    }
    let before_title = destination.end;
    let title_start = skip_spnl(text, before_title);
    let title = if title_start > before_title {
        scan_link_title(text, title_start)
    } else {
        None
    };

    // A title followed by junk is retried as a definition without a title.
    let (title, len) = match title.and_then(|(raw, end)| Some((raw, line_end_after(text, end)?))) {
        Some((raw, end)) => (Some(unescape(raw)), end),
        None => (None, line_end_after(text, before_title)?),
    };

    Some(ParsedDefinition {
        label: label.to_string(),
        url: unescape(destination.raw),
        title,
        len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_fold_case_and_whitespace() {
        assert_eq!(normalize_label("  Foo\n\tBAR  "), "foo bar");
        assert_eq!(normalize_label("ẞ"), normalize_label("SS"));
        assert!(is_valid_label("foo \\[bar", 999));
        assert!(!is_valid_label("foo [bar", 999));
        assert!(!is_valid_label(" \n", 999));
    }

    #[test]
    fn label_scanning() {
        assert_eq!(scan_link_label("[a\\]b] x", 0, 999), Some(("a\\]b", 6)));
        assert_eq!(scan_link_label("[a[b]", 0, 999), None);
        assert_eq!(scan_link_label("[abcd]", 0, 3), None);
    }

    #[test]
    fn destinations() {
        let dest = scan_link_destination("<a b>", 0, 32).unwrap();
        assert_eq!((dest.raw, dest.pointy, dest.end), ("a b", true, 5));
        let dest = scan_link_destination("/u(x(y))z rest", 0, 32).unwrap();
        assert_eq!(dest.raw, "/u(x(y))z");
        assert_eq!(scan_link_destination("/u(x", 0, 32), None);
        assert_eq!(scan_link_destination(")", 0, 32).map(|d| d.raw), Some(""));
        assert_eq!(scan_link_destination(" x", 0, 32), None);
    }

    #[test]
    fn inline_link_tail() {
        let link = parse_inline_link("(/url \"ti\\\"tle\") after", 0, 32).unwrap();
        assert_eq!(link.url, "/url");
        assert_eq!(link.title.as_deref(), Some("ti\"tle"));
        assert_eq!(link.end, 16);
        assert_eq!(parse_inline_link("()", 0, 32).map(|l| l.url), Some(String::new()));
        assert_eq!(parse_inline_link("(/a b)", 0, 32), None);
    }

    #[test]
    fn reference_definitions() {
        let def = parse_reference_definition("[Foo]:\n  /url\n'the title'\nrest", 999, 32).unwrap();
        assert_eq!(def.label, "Foo");
        assert_eq!(def.url, "/url");
        assert_eq!(def.title.as_deref(), Some("the title"));
        assert_eq!(&"[Foo]:\n  /url\n'the title'\nrest"[def.len..], "rest");

        let def = parse_reference_definition("[foo]: /url\n\"title\" ok", 999, 32).unwrap();
        assert_eq!(def.title, None);
        assert_eq!(def.len, 12);

        assert_eq!(parse_reference_definition("[foo]: /url 'title' junk", 999, 32), None);
        assert_eq!(parse_reference_definition("[foo]:", 999, 32), None);
        assert_eq!(parse_reference_definition("[]: /url", 999, 32), None);
    }
}
