use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::span::Span;

pub const TAB_STOP: usize = 4;

/// Indentation (in columns) at which a line becomes indented code.
pub const CODE_INDENT: usize = 4;

/// One raw line held by a leaf block.
///
/// `virtual_spaces` counts the columns left over from a tab that a container prefix
/// consumed only partly; they are materialized as spaces in front of the span text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSlice {
    pub span: Span,
    pub virtual_spaces: usize,
}

impl LineSlice {
    pub fn new(span: Span, virtual_spaces: usize) -> Self {
        LineSlice {
            span,
            virtual_spaces,
        }
    }

    /// The line's text; borrowed unless virtual spaces or NUL characters force a copy.
    pub fn text<'a>(&self, source: &'a str) -> Cow<'a, str> {
        let raw = self.span.text(source);
        if self.virtual_spaces == 0 && !raw.contains('\0') {
            return Cow::Borrowed(raw);
        }
        let mut out = String::with_capacity(raw.len() + self.virtual_spaces);
        self.push_to(source, &mut out);
        Cow::Owned(out)
    }

    pub(crate) fn push_to(&self, source: &str, out: &mut String) {
        out.extend(std::iter::repeat_n(' ', self.virtual_spaces));
        push_replacing_nul(self.span.text(source), out);
    }
}

pub(crate) fn push_replacing_nul(text: &str, out: &mut String) {
    if text.contains('\0') {
        out.push_str(&text.replace('\0', "\u{FFFD}"));
    } else {
        out.push_str(text);
    }
}

pub(crate) fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Tab-aware position within the current source line.
///
/// `offset` is a byte offset into the whole source; `column` is the visual column with
/// tabs rounded up to the next multiple of [`TAB_STOP`]. When a container prefix ends in
/// the middle of a tab, `offset` stays on the tab and `partially_consumed_tab` is set.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    source: &'a str,
    number: usize,
    start: usize,
    end: usize,
    offset: usize,
    column: usize,
    partially_consumed_tab: bool,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
}

impl<'a> LineCursor<'a> {
    pub fn new(source: &'a str, number: usize, start: usize, end: usize) -> Self {
        let mut cursor = LineCursor {
            source,
            number,
            start,
            end,
            offset: start,
            column: 0,
            partially_consumed_tab: false,
            first_nonspace: start,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
        };
        cursor.find_first_nonspace();
        cursor
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }

    pub fn first_nonspace(&self) -> usize {
        self.first_nonspace
    }

    pub fn first_nonspace_column(&self) -> usize {
        self.first_nonspace_column
    }

    pub fn partially_consumed_tab(&self) -> bool {
        self.partially_consumed_tab
    }

    /// The unconsumed rest of the line.
    pub fn rest(&self) -> &'a str {
        &self.source[self.offset..self.end]
    }

    /// The rest of the line starting at the first non-space character.
    pub fn rest_from_nonspace(&self) -> &'a str {
        &self.source[self.first_nonspace..self.end]
    }

    pub fn peek_nonspace(&self) -> Option<char> {
        self.source[self.first_nonspace..self.end].chars().next()
    }

    pub fn peek(&self) -> Option<u8> {
        if self.offset < self.end {
            Some(self.source.as_bytes()[self.offset])
        } else {
            None
        }
    }

    /// Recomputes indentation and the blank flag from the current position.
    pub fn find_first_nonspace(&mut self) {
        let bytes = self.source.as_bytes();
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
        self.first_nonspace = self.offset;
        self.first_nonspace_column = self.column;
        while self.first_nonspace < self.end {
            match bytes[self.first_nonspace] {
                b' ' => {
                    self.first_nonspace += 1;
                    self.first_nonspace_column += 1;
                    chars_to_tab -= 1;
                    if chars_to_tab == 0 {
                        chars_to_tab = TAB_STOP;
                    }
                }
                b'\t' => {
                    self.first_nonspace += 1;
                    self.first_nonspace_column += chars_to_tab;
                    chars_to_tab = TAB_STOP;
                }
                _ => break,
            }
        }
        self.indent = self.first_nonspace_column - self.column;
        self.blank = self.first_nonspace >= self.end;
    }

    /// Advances by `count` characters, or by `count` columns when `columns` is set.
    ///
    /// Advancing by columns may stop inside a tab.
    pub fn advance(&mut self, mut count: usize, columns: bool) {
        let bytes = self.source.as_bytes();
        while count > 0 && self.offset < self.end {
            if bytes[self.offset] == b'\t' {
                let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let step = chars_to_tab.min(count);
                    self.column += step;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= step;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                let width = self.source[self.offset..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                self.offset += width;
                self.column += 1;
                count -= 1;
            }
        }
    }

    pub fn advance_to_nonspace(&mut self) {
        self.find_first_nonspace();
        let count = self.first_nonspace - self.offset;
        self.advance(count, false);
    }

    /// Takes the rest of the line as a leaf line and moves to the end.
    pub fn take_rest(&mut self) -> LineSlice {
        let mut start = self.offset;
        let mut virtual_spaces = 0;
        if self.partially_consumed_tab {
            start += 1;
            virtual_spaces = TAB_STOP - (self.column % TAB_STOP);
        }
        self.offset = self.end;
        self.partially_consumed_tab = false;
        LineSlice::new(self.span(start, self.end), virtual_spaces)
    }

    pub fn advance_to_end(&mut self) {
        self.offset = self.end;
        self.partially_consumed_tab = false;
        self.find_first_nonspace();
    }

    /// Span of an absolute byte range on this line. Like every [`Span`], its column
    /// counts bytes, so it agrees with [`crate::span::LineIndex::locate`]; the visual
    /// column with tabs expanded is [`LineCursor::column`].
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(start, end, self.number, start - self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor(text: &str) -> LineCursor<'_> {
        LineCursor::new(text, 0, 0, text.len())
    }

    #[test]
    fn span_columns_count_bytes_like_the_line_index() {
        let text = "a\n\u{e9}\tx";
        let index = crate::span::LineIndex::new(text);
        let cursor = LineCursor::new(text, 1, 2, text.len());
        let x = text.len() - 1;
        let span = cursor.span(x, text.len());
        assert_eq!((span.line, span.column), index.locate(x));
        assert_eq!(span.column, 3);
    }

    #[test]
    fn tabs_round_up_to_the_next_stop() {
        let c = cursor("  \tfoo");
        assert_eq!(c.indent(), 4);
        assert_eq!(c.first_nonspace(), 3);
        assert!(!c.is_blank());
    }

    #[test]
    fn partial_tab_leaves_virtual_spaces() {
        let mut c = cursor(">\t\tfoo");
        c.advance(1, false);
        c.advance(1, true);
        assert!(c.partially_consumed_tab());
        let line = c.take_rest();
        assert_eq!(line.virtual_spaces, 2);
        assert_eq!(line.text(">\t\tfoo"), "  \tfoo");
    }

    #[test]
    fn blank_line_detection() {
        assert!(cursor(" \t ").is_blank());
        assert!(cursor("").is_blank());
    }

    #[test]
    fn nul_is_replaced_when_materialized() {
        let text = "a\0b";
        let line = cursor(text).take_rest();
        assert_eq!(line.text(text), "a\u{FFFD}b");
    }
}
