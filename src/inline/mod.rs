//! Inline phase: turns each leaf's raw lines into an inline tree.
//!
//! The leaf's lines are joined into one buffer. At every position the parsers
//! registered for the current character are tried, then the fallback parsers, then the
//! built-in literal run. Link openers stay open and collect what follows them until a
//! `]` resolves or degrades them; emphasis is resolved once the buffer is exhausted.

mod autolink;
mod code_span;
mod emphasis;
mod entity;
mod escape;
mod line_break;
mod link;

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

pub use autolink::AutolinkParser;
pub use code_span::CodeSpanParser;
pub use emphasis::EmphasisParser;
pub(crate) use emphasis::process_emphasis;
pub use entity::EntityParser;
pub use escape::EscapeParser;
pub use line_break::LineBreakParser;
pub use link::{LinkCloseParser, LinkOpenParser};

use crate::ast::{BlockId, Delimiter, Document, InlineArena, InlineId, InlineKind, LinkReferenceMap};
use crate::error::ParseError;
use crate::line::is_space_or_tab;
use crate::options::ParseOptions;
use crate::span::{LineIndex, Span};

/// An inline syntax, tried at positions holding one of its opening characters.
pub trait InlineParser: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Characters this parser is tried on. Empty registers it as a fallback, tried at
    /// every position after the character-mapped parsers.
    fn opening_characters(&self) -> &[char];

    /// Tries to parse at [`InlineProcessor::pos`]. On a match the parser must push its
    /// node(s) and advance past what it consumed; on failure the position is restored.
    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool;
}

/// Inline parsers indexed by opening character.
#[derive(Debug, Default)]
pub struct InlineParserTable {
    parsers: Vec<Box<dyn InlineParser>>,
    ascii: Vec<Vec<usize>>,
    other: HashMap<char, Vec<usize>>,
    fallbacks: Vec<usize>,
}

impl InlineParserTable {
    pub(crate) fn new(parsers: Vec<Box<dyn InlineParser>>) -> Self {
        let mut table = InlineParserTable {
            ascii: vec![Vec::new(); 128],
            ..InlineParserTable::default()
        };
        for (index, parser) in parsers.iter().enumerate() {
            let opening = parser.opening_characters();
            if opening.is_empty() {
                table.fallbacks.push(index);
            }
            for &c in opening {
                if c.is_ascii() {
                    table.ascii[c as usize].push(index);
                } else {
                    table.other.entry(c).or_default().push(index);
                }
            }
        }
        table.parsers = parsers;
        table
    }

    pub fn parsers(&self) -> &[Box<dyn InlineParser>] {
        &self.parsers
    }

    fn for_char(&self, c: char) -> &[usize] {
        if c.is_ascii() {
            &self.ascii[c as usize]
        } else {
            self.other.get(&c).map_or(&[], Vec::as_slice)
        }
    }

    fn is_opening(&self, c: char) -> bool {
        !self.for_char(c).is_empty()
    }
}

/// Maps a run of the buffer back to the source line it came from.
#[derive(Debug, Clone, Copy)]
struct Segment {
    buffer_start: usize,
    source_start: usize,
    source_end: usize,
    virtual_spaces: usize,
}

/// Per-leaf state handed to inline parsers.
pub struct InlineProcessor<'d> {
    buffer: String,
    segments: Vec<Segment>,
    pos: usize,
    arena: &'d mut InlineArena,
    references: &'d LinkReferenceMap,
    line_index: &'d LineIndex,
    table: &'d InlineParserTable,
    options: &'d ParseOptions,
    root: InlineId,
    tip: InlineId,
}

impl<'d> InlineProcessor<'d> {
    /// The leaf's text: lines joined with `\n`, trailing spaces and tabs of the last
    /// line removed.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.buffer.len());
    }

    /// Unconsumed text from the current position.
    pub fn rest(&self) -> &str {
        &self.buffer[self.pos..]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Character before the current position, if any.
    pub fn previous_char(&self) -> Option<char> {
        self.buffer[..self.pos].chars().next_back()
    }

    pub fn references(&self) -> &LinkReferenceMap {
        self.references
    }

    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    pub fn arena(&self) -> &InlineArena {
        self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut InlineArena {
        self.arena
    }

    /// Source span of the buffer range `start..end`.
    pub fn span(&self, start: usize, end: usize) -> Span {
        let source_start = self.source_offset(start);
        let source_end = self.source_offset(end).max(source_start);
        let (line, column) = self.line_index.locate(source_start);
        Span::new(source_start, source_end, line, column)
    }

    fn source_offset(&self, at: usize) -> usize {
        let index = self
            .segments
            .partition_point(|segment| segment.buffer_start <= at)
            .saturating_sub(1);
        let Some(segment) = self.segments.get(index) else {
            return 0;
        };
        let relative = at.saturating_sub(segment.buffer_start);
        if relative < segment.virtual_spaces {
            return segment.source_start;
        }
        (segment.source_start + relative - segment.virtual_spaces).min(segment.source_end)
    }

    /// Appends a finished node for the buffer range `start..end` to the innermost open
    /// container.
    pub fn push(&mut self, kind: InlineKind, start: usize, end: usize) -> InlineId {
        let span = self.span(start, end);
        let node = self.arena.alloc(kind, span, true);
        self.arena.append_child(self.tip, node);
        node
    }

    pub fn push_text(&mut self, text: impl Into<String>, start: usize, end: usize) -> InlineId {
        self.push(InlineKind::Text(text.into()), start, end)
    }

    /// Appends a link or image opener that collects the nodes after it.
    pub(crate) fn push_opener(&mut self, delimiter: Delimiter, end: usize) -> InlineId {
        let span = self.span(delimiter.position, end);
        let node = self.arena.alloc(InlineKind::Delimiter(delimiter), span, false);
        self.arena.append_child(self.tip, node);
        self.tip = node;
        node
    }

    /// The innermost open link or image opener.
    pub(crate) fn open_link(&self) -> Option<InlineId> {
        (self.tip != self.root).then_some(self.tip)
    }

    /// Turns an opener back into literal text, leaving what it collected after it.
    pub(crate) fn degrade_opener(&mut self, opener: InlineId) {
        let node = self.arena.get(opener);
        let literal = node.delimiter().map(Delimiter::literal).unwrap_or_default();
        let span = node.span;
        let text = self.arena.alloc(InlineKind::Text(literal), span, true);
        self.arena.dissolve(opener, text);
        self.close_opener(opener);
    }

    /// Marks an opener closed and moves the insertion point to its parent.
    pub(crate) fn close_opener(&mut self, opener: InlineId) {
        self.arena.get_mut(opener).closed = true;
        if self.tip == opener {
            self.tip = self.arena.parent_of(opener).unwrap_or(self.root);
        }
    }

    /// Consumes one character, then everything up to the next opening character.
    fn parse_literal(&mut self) {
        let start = self.pos;
        let mut chars = self.buffer[start..].char_indices();
        let mut end = self.buffer.len();
        chars.next();
        for (offset, c) in chars {
            if self.table.is_opening(c) {
                end = start + offset;
                break;
            }
        }
        self.pos = end;
        let mut text_end = end;
        // spaces before a line ending belong to the line break
        if self.buffer[end..].starts_with('\n') {
            text_end = start + self.buffer[start..end].trim_end_matches(' ').len();
        }
        if text_end > start {
            let text = self.buffer[start..text_end].to_string();
            self.push_text(text, start, text_end);
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        let table = self.table;
        while self.pos < self.buffer.len() {
            let start = self.pos;
            let Some(c) = self.peek() else { break };
            let mut matched = false;
            for &index in table.for_char(c).iter().chain(&table.fallbacks) {
                let parser = &table.parsers[index];
                if parser.try_match(self) {
                    if self.pos <= start {
                        return Err(ParseError::NoProgress {
                            parser: parser.name(),
                            offset: self.source_offset(start),
                        });
                    }
                    matched = true;
                    break;
                }
                self.pos = start;
            }
            if !matched {
                self.parse_literal();
            }
        }

        while let Some(opener) = self.open_link() {
            trace!("unclosed opener at {} degraded", self.arena.get(opener).span.start);
            self.degrade_opener(opener);
        }
        let root = self.root;
        process_emphasis(&mut *self.arena, root);
        self.arena.merge_adjacent_text(root);
        self.arena.settle_parents(root);
        Ok(())
    }
}

/// Parses the inline content of one leaf block and attaches the resulting tree to it.
pub(crate) fn parse_leaf(
    document: &mut Document<'_>,
    block: BlockId,
    table: &InlineParserTable,
    options: &ParseOptions,
) -> Result<(), ParseError> {
    let source = document.source();
    let mut buffer = String::new();
    let mut segments = Vec::new();
    for (i, line) in document.block(block).lines().iter().enumerate() {
        if i > 0 {
            buffer.push('\n');
        }
        segments.push(Segment {
            buffer_start: buffer.len(),
            source_start: line.span.start,
            source_end: line.span.end,
            virtual_spaces: line.virtual_spaces,
        });
        line.push_to(source, &mut buffer);
    }
    let trimmed = buffer.trim_end_matches(|c: char| c.is_ascii() && is_space_or_tab(c as u8)).len();
    buffer.truncate(trimmed);

    let Document {
        line_index,
        inlines,
        link_references,
        blocks,
        ..
    } = document;
    let leaf = &mut blocks[block.index()];
    let root = inlines.alloc(InlineKind::Root, leaf.span, false);
    leaf.inline = Some(root);

    let mut processor = InlineProcessor {
        buffer,
        segments,
        pos: 0,
        arena: inlines,
        references: link_references,
        line_index,
        table,
        options,
        root,
        tip: root,
    };
    processor.run()?;
    processor.arena.get_mut(root).closed = true;
    Ok(())
}

/// Whether `c` counts as whitespace for flanking: Unicode `Zs` plus tab, line feed,
/// form feed and carriage return.
pub(crate) fn is_flanking_whitespace(c: char) -> bool {
    use unicode_general_category::{GeneralCategory, get_general_category};
    matches!(c, '\t' | '\n' | '\u{0C}' | '\r') || get_general_category(c) == GeneralCategory::SpaceSeparator
}

/// Unicode punctuation: the `P` and `S` general categories.
pub(crate) fn is_flanking_punctuation(c: char) -> bool {
    use unicode_general_category::{GeneralCategory::*, get_general_category};
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(
        get_general_category(c),
        ConnectorPunctuation
            | DashPunctuation
            | OpenPunctuation
            | ClosePunctuation
            | InitialPunctuation
            | FinalPunctuation
            | OtherPunctuation
            | MathSymbol
            | CurrencySymbol
            | ModifierSymbol
            | OtherSymbol
    )
}
