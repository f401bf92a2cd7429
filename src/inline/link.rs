//! Link and image brackets.
//!
//! `[` and `![` push an open opener node that collects what follows. `]` looks at the
//! innermost opener and either turns it into a link or image in place or degrades it
//! back to literal text.

use tracing::{debug, trace};

use super::{InlineParser, InlineProcessor, process_emphasis};
use crate::ast::{Delimiter, DelimiterKind, DelimiterType, InlineKind, LinkData};
use crate::link_syntax::{is_valid_label, normalize_label, parse_inline_link, scan_link_label};

/// `[` and `![` openers.
#[derive(Debug, Default)]
pub struct LinkOpenParser;

/// `]`, which resolves the innermost opener.
#[derive(Debug, Default)]
pub struct LinkCloseParser;

impl InlineParser for LinkOpenParser {
    fn name(&self) -> &'static str {
        "link_open"
    }

    fn opening_characters(&self) -> &[char] {
        &['[', '!']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let image = processor.rest().starts_with("![");
        if !image && !processor.rest().starts_with('[') {
            return false;
        }
        let length = if image { 2 } else { 1 };
        let delimiter = Delimiter {
            kind: DelimiterKind::Link { image },
            character: '[',
            delimiter_type: DelimiterType::Open,
            active: true,
            length,
            original_length: length,
            position: start,
        };
        processor.push_opener(delimiter, start + length);
        processor.set_pos(start + length);
        true
    }
}

impl InlineParser for LinkCloseParser {
    fn name(&self) -> &'static str {
        "link_close"
    }

    fn opening_characters(&self) -> &[char] {
        &[']']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let close = processor.pos();
        processor.set_pos(close + 1);

        let Some(opener) = processor.open_link() else {
            processor.push_text("]", close, close + 1);
            return true;
        };
        let Some(delimiter) = processor.arena().get(opener).delimiter().cloned() else {
            processor.push_text("]", close, close + 1);
            return true;
        };
        let image = matches!(delimiter.kind, DelimiterKind::Link { image: true });

        // An opener inside a finished link can no longer become a link
        if !delimiter.active {
            processor.degrade_opener(opener);
            processor.push_text("]", close, close + 1);
            return true;
        }

        let text_start = delimiter.position + delimiter.original_length;
        let Some((link, end)) = resolve_destination(processor, text_start, close) else {
            trace!("no destination for bracket at {}", delimiter.position);
            processor.degrade_opener(opener);
            processor.push_text("]", close, close + 1);
            return true;
        };
        debug!("resolved {} to {:?}", if image { "image" } else { "link" }, link.url);

        let span = processor.span(delimiter.position, end);
        let arena = processor.arena_mut();
        let node = arena.get_mut(opener);
        node.kind = if image { InlineKind::Image(link) } else { InlineKind::Link(link) };
        node.span.end = span.end;

        // No links inside links: earlier link openers are all ancestors of this one.
        // An enclosing image may still sit inside a link, so the walk stops there.
        if !image {
            let mut ancestor = arena.parent_of(opener);
            while let Some(id) = ancestor {
                if let Some(outer) = arena.get_mut(id).delimiter_mut() {
                    if outer.kind == (DelimiterKind::Link { image: true }) {
                        break;
                    }
                    if outer.kind == (DelimiterKind::Link { image: false }) {
                        outer.active = false;
                    }
                }
                ancestor = arena.parent_of(id);
            }
        }
        process_emphasis(arena, opener);
        processor.close_opener(opener);
        processor.set_pos(end);
        true
    }
}

/// Tries the inline form and then the reference forms after the `]` at `close`.
/// Returns the link and the buffer offset just past the consumed syntax.
fn resolve_destination(processor: &InlineProcessor<'_>, text_start: usize, close: usize) -> Option<(LinkData, usize)> {
    let buffer = processor.buffer();
    let options = processor.options();
    let after = close + 1;

    if buffer[after..].starts_with('(')
        && let Some(inline) = parse_inline_link(buffer, after, options.max_parenthesis_nesting)
    {
        let link = LinkData {
            url: inline.url,
            title: inline.title,
            reference: None,
        };
        return Some((link, inline.end));
    }

    // Full reference, otherwise collapsed or shortcut using the bracketed text
    let text = &buffer[text_start..close];
    let (label, end, uses_text) = match scan_link_label(buffer, after, options.max_link_label_length) {
        Some((label, end)) if !label.is_empty() => (label, end, false),
        Some((_, end)) => (text, end, true),
        None => (text, after, true),
    };
    if uses_text && !is_valid_label(text, options.max_link_label_length) {
        return None;
    }
    let key = normalize_label(label);
    let definition = processor.references().get(&key)?;
    let link = LinkData {
        url: definition.url.clone(),
        title: definition.title.clone(),
        reference: Some(key),
    };
    Some((link, end))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    fn outline(text: &str) -> String {
        crate::parse_document(text).unwrap().outline().to_string()
    }

    #[test]
    fn inline_links_and_images() {
        assert_eq!(
            outline("[a *b*](/u \"t\")"),
            r#"(document (paragraph (link "/u" "t" "a " (emphasis "b"))))"#
        );
        assert_eq!(outline("![alt](/i.png)"), r#"(document (paragraph (image "/i.png" "alt")))"#);
    }

    #[test]
    fn reference_forms() {
        let refs = "\n\n[foo]: /f 'T'";
        assert_eq!(
            outline(&format!("[x][foo]{refs}")),
            r#"(document (paragraph (link "/f" "T" "x")))"#
        );
        assert_eq!(
            outline(&format!("[Foo][]{refs}")),
            r#"(document (paragraph (link "/f" "T" "Foo")))"#
        );
        assert_eq!(outline(&format!("[foo]{refs}")), r#"(document (paragraph (link "/f" "T" "foo")))"#);
        assert_eq!(outline(&format!("[x][bar]{refs}")), r#"(document (paragraph "[x][bar]"))"#);
    }

    #[test]
    fn forward_references_resolve() {
        assert_eq!(outline("[x]\n\n[x]: /u"), r#"(document (paragraph (link "/u" "x")))"#);
    }

    #[test]
    fn links_do_not_nest() {
        assert_eq!(
            outline("[a [b](/b) c](/a)"),
            r#"(document (paragraph "[a " (link "/b" "b") " c](/a)"))"#
        );
        assert_eq!(
            outline("![a [b](/b) c](/a)"),
            r#"(document (paragraph (image "/a" "a " (link "/b" "b") " c")))"#
        );
    }

    #[test]
    fn link_inside_an_image_leaves_the_outer_link_open() {
        assert_eq!(
            outline("[![a [b](/b)](/i)](/a)"),
            r#"(document (paragraph (link "/a" (image "/i" "a " (link "/b" "b")))))"#
        );
    }

    #[test]
    fn failed_brackets_are_literal() {
        assert_eq!(outline("[a](<b)c>"), r#"(document (paragraph "[a](<b)c>"))"#);
        assert_eq!(outline("a]b"), r#"(document (paragraph "a]b"))"#);
        assert_eq!(outline("[*a]*"), r#"(document (paragraph "[" (emphasis "a]")))"#);
    }

    #[test]
    fn link_text_takes_precedence_over_emphasis() {
        assert_eq!(
            outline("*[a*](/u)"),
            r#"(document (paragraph "*" (link "/u" "a*")))"#
        );
    }
}
