use serde::{Deserialize, Serialize};

/// A byte range over the source text with the line and column of its start.
///
/// Lines and columns are zero based; the column counts bytes from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Span {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// The slice of `source` this span covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Drops `count` bytes from the front. Only valid while the span stays on one line.
    pub(crate) fn shrink_start(&mut self, count: usize) {
        self.start += count;
        self.column += count;
    }

    pub(crate) fn shrink_end(&mut self, count: usize) {
        self.end -= count;
    }
}

/// Start and end offsets of one source line, line ending excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBounds {
    pub start: usize,
    pub end: usize,
}

/// Line table for a source text.
///
/// Lines end at `\n`, `\r\n` or a lone `\r`. A trailing line ending does not start
/// another line.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    lines: Vec<LineBounds>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut lines = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    lines.push(LineBounds { start, end: i });
                    i += 1;
                    start = i;
                }
                b'\r' => {
                    lines.push(LineBounds { start, end: i });
                    i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                    start = i;
                }
                _ => i += 1,
            }
        }
        if start < bytes.len() {
            lines.push(LineBounds {
                start,
                end: bytes.len(),
            });
        }
        LineIndex { lines }
    }

    pub fn lines(&self) -> &[LineBounds] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Zero based (line, column) of a byte offset.
    pub fn locate(&self, offset: usize) -> (usize, usize) {
        let line = self
            .lines
            .partition_point(|bounds| bounds.start <= offset)
            .saturating_sub(1);
        match self.lines.get(line) {
            Some(bounds) => (line, offset.saturating_sub(bounds.start)),
            None => (0, offset),
        }
    }

    pub fn span(&self, start: usize, end: usize) -> Span {
        let (line, column) = self.locate(start);
        Span::new(start, end, line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_every_line_ending() {
        let index = LineIndex::new("a\nbb\r\nc\rd");
        let bounds: Vec<_> = index.lines().iter().map(|b| (b.start, b.end)).collect();
        assert_eq!(bounds, vec![(0, 1), (2, 4), (6, 7), (8, 9)]);
    }

    #[test]
    fn trailing_newline_does_not_add_a_line() {
        assert_eq!(LineIndex::new("a\n").len(), 1);
        assert!(LineIndex::new("").is_empty());
    }

    #[test]
    fn locates_offsets() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.locate(0), (0, 0));
        assert_eq!(index.locate(4), (1, 1));
        assert_eq!(index.span(3, 5), Span::new(3, 5, 1, 0));
    }
}
