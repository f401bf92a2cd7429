//! Block structure: the line-by-line state machine and the contract its parsers follow.
//!
//! Each line first walks the open frames from the document inward, letting every frame's
//! parser consume its prefix (`try_continue`). Whatever is left is offered to the
//! registered parsers in priority order (`try_open`). Frames that did not match the line
//! are closed at its end, innermost first.

mod code;
mod heading;
mod html;
mod list;
mod paragraph;
mod quote;
mod thematic_break;

use std::fmt;

use tracing::{debug, trace};

pub use code::{FencedCodeParser, IndentedCodeParser};
pub use heading::{AtxHeadingParser, SetextHeadingParser};
pub use html::HtmlBlockParser;
pub use list::ListParser;
pub use paragraph::{ParagraphParser, extract_link_references};
pub use quote::BlockQuoteParser;
pub use thematic_break::ThematicBreakParser;

use crate::ast::{Block, BlockId, BlockKind, Document};
use crate::error::ParseError;
use crate::line::{LineCursor, LineSlice};
use crate::options::ParseOptions;

/// Outcome of [`BlockParser::try_open`] and [`BlockParser::try_continue`].
///
/// | state           | `try_continue`                                | `try_open`                                   |
/// |-----------------|-----------------------------------------------|----------------------------------------------|
/// | `None`          | frame unmatched, the walk stops               | nothing opened                               |
/// | `Continue`      | prefix consumed, go to the next inner frame   | container: rescan; leaf: line consumed       |
/// | `Break`         | the leaf takes the rest of the line           | the new leaf takes the rest of the line      |
/// | `BreakKeepLine` | as `Break`, then the block closes             | as `Break`, then the block closes            |
/// | `Discard`       | line consumed without content, block closes   | same; used by single-line leaves             |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    None,
    Continue,
    Break,
    BreakKeepLine,
    Discard,
}

/// A block syntax: opens blocks, continues them line by line, and finalizes them.
pub trait BlockParser: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Characters that may start this block after indentation. Empty means any.
    fn opening_characters(&self) -> &[char] {
        &[]
    }

    /// Whether this parser opens container blocks; those stop at the nesting limit.
    fn opens_containers(&self) -> bool {
        false
    }

    /// Whether this parser may open a block while a paragraph is the innermost open block.
    fn can_interrupt(&self, _processor: &BlockProcessor<'_, '_>) -> bool {
        true
    }

    /// Tries to start a block at the current position. A match must open a block with
    /// [`BlockProcessor::open_block`] or convert one with [`BlockProcessor::convert_block`].
    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState;

    /// Tries to continue an open block on the current line.
    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) -> BlockState;

    /// Finalizes a block; may trim it or remove it from the tree.
    fn close(&self, _processor: &mut BlockProcessor<'_, '_>, _block: BlockId) {}
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    parser: Option<usize>, // None for the document
    block: BlockId,
    matched: bool,
}

/// Drives the block parsers over every line of a source text.
pub struct BlockProcessor<'a, 'p> {
    document: Document<'a>,
    parsers: &'p [Box<dyn BlockParser>],
    options: &'p ParseOptions,
    cursor: LineCursor<'a>,
    frames: Vec<Frame>,
    last_matched: usize,
    current_parser: Option<usize>,
    new_block: Option<BlockId>,
    open_start: usize,
    line_claimed: bool,
}

impl<'a, 'p> BlockProcessor<'a, 'p> {
    pub(crate) fn new(
        source: &'a str,
        parsers: &'p [Box<dyn BlockParser>],
        options: &'p ParseOptions,
    ) -> Self {
        let document = Document::new(source);
        let root = document.root();
        BlockProcessor {
            document,
            parsers,
            options,
            cursor: LineCursor::new(source, 0, 0, 0),
            frames: vec![Frame {
                parser: None,
                block: root,
                matched: true,
            }],
            last_matched: 0,
            current_parser: None,
            new_block: None,
            open_start: 0,
            line_claimed: false,
        }
    }

    /// Runs the block phase over every line and closes whatever is still open.
    pub(crate) fn run(mut self) -> Result<Document<'a>, ParseError> {
        let source = self.document.source();
        let lines = self.document.line_index.lines().to_vec();
        for (number, bounds) in lines.iter().enumerate() {
            self.cursor = LineCursor::new(source, number, bounds.start, bounds.end);
            self.process_line()?;
        }
        while self.frames.len() > 1 {
            self.close_top();
        }
        let root = self.document.root();
        self.document.block_mut(root).open = false;
        debug!("block phase finished with {} blocks", self.document.blocks.len());
        Ok(self.document)
    }

    fn process_line(&mut self) -> Result<(), ParseError> {
        self.line_claimed = false;
        for frame in self.frames.iter_mut().skip(1) {
            frame.matched = false;
        }
        self.last_matched = 0;
        let parsers = self.parsers;

        let mut index = 1;
        while index < self.frames.len() {
            let frame = self.frames[index];
            let Some(parser_index) = frame.parser else {
                break;
            };
            self.cursor.find_first_nonspace();
            self.current_parser = frame.parser;
            let saved = self.cursor.clone();
            match parsers[parser_index].try_continue(self, frame.block) {
                BlockState::None => {
                    self.cursor = saved;
                    break;
                }
                BlockState::Continue => {
                    self.frames[index].matched = true;
                    self.last_matched = index;
                    index += 1;
                }
                state => {
                    self.frames[index].matched = true;
                    self.last_matched = index;
                    self.close_unmatched();
                    self.finish_leaf_line(frame.block, state);
                    self.extend_matched_spans();
                    return Ok(());
                }
            }
        }

        self.open_new_blocks()?;
        if !self.line_claimed {
            self.cursor.find_first_nonspace();
            if !self.cursor.is_blank() {
                return Err(ParseError::UnclaimedLine {
                    line: self.cursor.number(),
                });
            }
            let container = self.container();
            self.record_blank_state(container, true);
        }
        self.close_unmatched();
        self.extend_matched_spans();
        Ok(())
    }

    fn open_new_blocks(&mut self) -> Result<(), ParseError> {
        let parsers = self.parsers;
        'scan: loop {
            let kind = &self.document.block(self.container()).kind;
            if !kind.is_container() && !kind.is_paragraph() {
                return Ok(());
            }
            self.cursor.find_first_nonspace();
            if self.cursor.is_blank() {
                return Ok(());
            }
            let next = self.cursor.peek_nonspace();
            let at_depth_limit = self.frames.len() > self.options.max_nesting_depth;

            for (index, parser) in parsers.iter().enumerate() {
                let opening = parser.opening_characters();
                if !opening.is_empty() && !next.is_some_and(|c| opening.contains(&c)) {
                    continue;
                }
                if at_depth_limit && parser.opens_containers() {
                    continue;
                }
                if self.paragraph_at_tip() && !parser.can_interrupt(self) {
                    continue;
                }

                self.current_parser = Some(index);
                self.new_block = None;
                self.open_start = self.cursor.first_nonspace();
                let saved = self.cursor.clone();
                let state = parser.try_open(self);
                if state == BlockState::None {
                    self.cursor = saved;
                    continue;
                }
                let block = self.new_block.take().ok_or(ParseError::MissingBlock {
                    parser: parser.name(),
                    line: self.cursor.number(),
                })?;
                if state == BlockState::Continue && self.document.block(block).kind.is_container() {
                    continue 'scan;
                }
                self.finish_leaf_line(block, state);
                return Ok(());
            }
            return Ok(());
        }
    }

    /// Applies a leaf outcome to the rest of the line.
    fn finish_leaf_line(&mut self, block: BlockId, state: BlockState) {
        self.line_claimed = true;
        match state {
            BlockState::Break | BlockState::BreakKeepLine => {
                self.cursor.find_first_nonspace();
                let blank = self.cursor.is_blank();
                self.record_blank_state(block, blank);
                self.append_rest(block);
                if state == BlockState::BreakKeepLine {
                    self.close_block(block);
                }
            }
            BlockState::Discard => {
                self.cursor.advance_to_end();
                self.close_block(block);
            }
            BlockState::Continue | BlockState::None => {
                self.record_blank_state(block, false);
                self.cursor.advance_to_end();
            }
        }
    }

    /// Tracks trailing blank lines, which decide whether lists are tight.
    fn record_blank_state(&mut self, container: BlockId, blank: bool) {
        let line = self.cursor.number();
        if blank && let Some(&last) = self.document.block(container).children.last() {
            self.document.block_mut(last).last_line_blank = true;
        }
        let block = self.document.block(container);
        let last_line_blank = blank
            && match &block.kind {
                BlockKind::BlockQuote | BlockKind::Heading { .. } | BlockKind::ThematicBreak => false,
                BlockKind::CodeBlock(data) => data.fence.is_none(),
                // an item that opened empty on this very line does not count
                BlockKind::ListItem(_) => !(block.children.is_empty() && block.line() == line),
                _ => true,
            };
        self.document.block_mut(container).last_line_blank = last_line_blank;
        let mut parent = self.document.block(container).parent;
        while let Some(id) = parent {
            let ancestor = self.document.block_mut(id);
            ancestor.last_line_blank = false;
            parent = ancestor.parent;
        }
    }

    fn extend_matched_spans(&mut self) {
        let end = self.cursor.end();
        for frame in &self.frames {
            if frame.matched {
                let span = &mut self.document.blocks[frame.block.0].span;
                span.end = span.end.max(end);
            }
        }
    }

    fn close_unmatched(&mut self) {
        while self.frames.len() > self.last_matched + 1 {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if frame.matched {
            let end = self.cursor.end();
            let span = &mut self.document.block_mut(frame.block).span;
            span.end = span.end.max(end);
        }
        if let Some(index) = frame.parser {
            let parsers = self.parsers;
            let opening = self.current_parser.replace(index);
            parsers[index].close(self, frame.block);
            self.current_parser = opening;
        }
        self.document.block_mut(frame.block).open = false;
        trace!("closed {:?} at line {}", frame.block, self.cursor.number());
        if self.last_matched >= self.frames.len() {
            self.last_matched = self.frames.len().saturating_sub(1);
        }
    }

    /// Closes `block` and every frame nested inside it.
    pub fn close_block(&mut self, block: BlockId) {
        if let Some(index) = self.frames.iter().position(|frame| frame.block == block) {
            while self.frames.len() > index {
                self.close_top();
            }
        }
    }

    /// Opens a block of `kind` under the innermost matched container.
    ///
    /// Unmatched frames are closed first, then any frame that cannot hold `kind`. Opening
    /// a paragraph while a paragraph is the innermost open block continues that paragraph
    /// instead; if it had not matched this line, this is a lazy continuation line.
    pub fn open_block(&mut self, kind: BlockKind) -> BlockId {
        if kind.is_paragraph()
            && let Some(top) = self.frames.last().copied()
            && self.document.block(top.block).kind.is_paragraph()
        {
            if !top.matched {
                debug!("lazy continuation line {}", self.cursor.number());
            }
            for frame in &mut self.frames {
                frame.matched = true;
            }
            self.last_matched = self.frames.len() - 1;
            self.new_block = Some(top.block);
            return top.block;
        }

        // closing frames below runs their parsers' `close`
        let parser = self.current_parser;
        self.close_unmatched();
        while self.frames.len() > 1 && !self.document.block(self.tip()).kind.can_contain(&kind) {
            self.close_top();
        }
        let parent = self.tip();
        let span = self.cursor.span(self.open_start, self.cursor.end());
        trace!("opening {:?} at line {}", kind, span.line);
        let id = self.document.push_block(Block::new(kind, span, Some(parent)));
        self.frames.push(Frame {
            parser,
            block: id,
            matched: true,
        });
        self.last_matched = self.frames.len() - 1;
        self.new_block = Some(id);
        id
    }

    /// Changes the kind of an open block in place, reporting it as this line's block.
    pub fn convert_block(&mut self, block: BlockId, kind: BlockKind) {
        self.document.block_mut(block).kind = kind;
        self.new_block = Some(block);
    }

    /// Appends the rest of the current line to a leaf.
    pub fn append_rest(&mut self, block: BlockId) {
        let line = self.cursor.take_rest();
        self.push_line(block, line);
    }

    /// Appends the byte range `start..end` of the current line to a leaf.
    pub fn append_range(&mut self, block: BlockId, start: usize, end: usize) {
        let line = LineSlice::new(self.cursor.span(start, end), 0);
        self.push_line(block, line);
    }

    fn push_line(&mut self, block: BlockId, line: LineSlice) {
        let block = self.document.block_mut(block);
        block.span.end = block.span.end.max(line.span.end);
        block.lines.push(line);
    }

    /// Detaches a block from the tree.
    pub fn remove_block(&mut self, block: BlockId) {
        trace!("removing {:?}", block);
        self.document.remove_block(block);
    }

    pub fn document(&self) -> &Document<'a> {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document<'a> {
        &mut self.document
    }

    pub fn block(&self, block: BlockId) -> &Block {
        self.document.block(block)
    }

    pub fn block_mut(&mut self, block: BlockId) -> &mut Block {
        self.document.block_mut(block)
    }

    pub fn options(&self) -> &ParseOptions {
        self.options
    }

    pub fn cursor(&self) -> &LineCursor<'a> {
        &self.cursor
    }

    pub fn cursor_mut(&mut self) -> &mut LineCursor<'a> {
        &mut self.cursor
    }

    pub fn line_number(&self) -> usize {
        self.cursor.number()
    }

    pub fn indent(&self) -> usize {
        self.cursor.indent()
    }

    pub fn is_code_indent(&self) -> bool {
        self.cursor.indent() >= crate::line::CODE_INDENT
    }

    pub fn is_blank(&self) -> bool {
        self.cursor.is_blank()
    }

    pub fn peek_nonspace(&self) -> Option<char> {
        self.cursor.peek_nonspace()
    }

    pub fn advance(&mut self, count: usize, columns: bool) {
        self.cursor.advance(count, columns);
    }

    pub fn advance_to_nonspace(&mut self) {
        self.cursor.advance_to_nonspace();
    }

    /// Innermost container that matched the current line so far.
    pub fn container(&self) -> BlockId {
        self.frames[self.last_matched].block
    }

    /// Innermost open block, matched or not.
    pub fn tip(&self) -> BlockId {
        self.frames[self.frames.len() - 1].block
    }

    pub fn paragraph_at_tip(&self) -> bool {
        self.document.block(self.tip()).kind.is_paragraph()
    }

    /// The innermost open block if it is a paragraph that matched this line.
    pub fn matched_paragraph(&self) -> Option<BlockId> {
        let top = self.frames.last()?;
        (top.matched
            && self.last_matched + 1 == self.frames.len()
            && self.document.block(top.block).kind.is_paragraph())
        .then_some(top.block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ListMarker, LinkReferenceDefinition};
    use crate::pipeline::Pipeline;

    fn kinds(text: &str) -> Vec<(usize, String)> {
        let pipeline = Pipeline::commonmark();
        let document = crate::parse(text, &pipeline).unwrap();
        let mut out = Vec::new();
        fn walk(document: &Document<'_>, id: BlockId, depth: usize, out: &mut Vec<(usize, String)>) {
            let name = match &document.block(id).kind {
                BlockKind::Document => "document".to_string(),
                BlockKind::BlockQuote => "quote".to_string(),
                BlockKind::List(data) => format!("list tight={}", data.tight),
                BlockKind::ListItem(_) => "item".to_string(),
                BlockKind::Paragraph => format!("p {:?}", document.leaf_text(id)),
                BlockKind::Heading { level, .. } => format!("h{level} {:?}", document.leaf_text(id)),
                BlockKind::ThematicBreak => "hr".to_string(),
                BlockKind::CodeBlock(_) => format!("code {:?}", document.leaf_text(id)),
                BlockKind::HtmlBlock { kind } => format!("html{kind} {:?}", document.leaf_text(id)),
                BlockKind::Custom { name, .. } => name.to_string(),
            };
            out.push((depth, name));
            for &child in document.children(id) {
                walk(document, child, depth + 1, out);
            }
        }
        walk(&document, document.root(), 0, &mut out);
        out
    }

    fn shape(text: &str) -> Vec<String> {
        kinds(text)
            .into_iter()
            .map(|(depth, name)| format!("{}{}", "  ".repeat(depth), name))
            .collect()
    }

    #[test]
    fn quote_paragraph_spans_two_lines() {
        assert_eq!(shape("> a\n> b\n"), vec!["document", "  quote", r#"    p "a\nb""#]);
    }

    #[test]
    fn lazy_line_joins_the_quoted_paragraph() {
        assert_eq!(shape("> a\np\n> b\n"), vec!["document", "  quote", r#"    p "a\np\nb""#]);
    }

    #[test]
    fn lazy_line_cannot_start_indented_code() {
        assert_eq!(shape("> a\n    b"), vec!["document", "  quote", r#"    p "a\nb""#]);
    }

    #[test]
    fn thematic_break_after_lazy_paragraph() {
        assert_eq!(shape("> a\n---"), vec!["document", "  quote", r#"    p "a""#, "  hr"]);
    }

    #[test]
    fn setext_beats_thematic_break_under_a_paragraph() {
        assert_eq!(shape("a\n---"), vec!["document", r#"  h2 "a""#]);
        assert_eq!(shape("a\n==="), vec!["document", r#"  h1 "a""#]);
    }

    #[test]
    fn blocks_that_interrupt_a_paragraph_continue_on_later_lines() {
        assert_eq!(
            shape("a\n> b\n> c"),
            vec!["document", r#"  p "a""#, "  quote", r#"    p "b\nc""#]
        );
        assert_eq!(
            shape("a\n- b\n- c"),
            vec![
                "document",
                r#"  p "a""#,
                "  list tight=true",
                "    item",
                r#"      p "b""#,
                "    item",
                r#"      p "c""#,
            ]
        );
        assert_eq!(shape("a\n```\nb\n```"), vec!["document", r#"  p "a""#, r#"  code "b""#]);
        assert_eq!(shape("a\n<div>\nb"), vec!["document", r#"  p "a""#, r#"  html6 "<div>\nb""#]);
        assert_eq!(shape("p\n<!-- x\ny"), vec!["document", r#"  p "p""#, r#"  html2 "<!-- x\ny""#]);
        assert_eq!(shape("a\n<?x\nb"), vec!["document", r#"  p "a""#, r#"  html3 "<?x\nb""#]);
    }

    #[test]
    fn sublist_interrupting_an_item_paragraph_stays_one_list() {
        let shape = shape("- a\n  - b\n\n  - c");
        assert_eq!(shape.iter().filter(|line| line.trim().starts_with("list")).count(), 2);
        assert_eq!(shape.iter().filter(|line| line.trim() == "item").count(), 3);
    }

    #[test]
    fn tabs_inside_quotes_keep_their_remaining_columns() {
        assert_eq!(shape(">\t\tfoo"), vec!["document", "  quote", r#"    code "  foo""#]);
    }

    #[test]
    fn list_items_and_tightness() {
        assert_eq!(
            shape("- a\n- b\n\n- c"),
            vec![
                "document",
                "  list tight=false",
                "    item",
                r#"      p "a""#,
                "    item",
                r#"      p "b""#,
                "    item",
                r#"      p "c""#,
            ]
        );
        assert_eq!(
            shape("1. a\n2. b"),
            vec!["document", "  list tight=true", "    item", r#"      p "a""#, "    item", r#"      p "b""#]
        );
    }

    #[test]
    fn changing_bullet_starts_a_new_list() {
        let shape = shape("- a\n+ b");
        assert_eq!(shape.iter().filter(|line| line.trim().starts_with("list")).count(), 2);
    }

    #[test]
    fn ordered_list_must_start_at_one_to_interrupt() {
        assert_eq!(shape("a\n2. b"), vec!["document", r#"  p "a\n2. b""#]);
        assert_eq!(shape("a\n1. b")[1], "  list tight=true");
    }

    #[test]
    fn empty_item_cannot_interrupt_a_paragraph() {
        assert_eq!(shape("a\n-\nb"), vec!["document", r#"  h2 "a""#, r#"  p "b""#]);
        assert_eq!(shape("a\n*\nb"), vec!["document", r#"  p "a\n*\nb""#]);
    }

    #[test]
    fn item_continuation_needs_content_indent() {
        assert_eq!(
            shape("- a\n\n  b\nc"),
            vec![
                "document",
                "  list tight=false",
                "    item",
                r#"      p "a""#,
                r#"      p "b\nc""#,
            ]
        );
    }

    #[test]
    fn fenced_code_runs_to_its_closing_fence() {
        assert_eq!(
            shape("```rust\n  x\n```\ny"),
            vec!["document", r#"  code "  x""#, r#"  p "y""#]
        );
        assert_eq!(shape("  ```\n  a\n b\nc"), vec!["document", r#"  code "a\nb\nc""#]);
    }

    #[test]
    fn indented_code_drops_trailing_blank_lines() {
        assert_eq!(shape("    a\n\n    b\n\n\nc"), vec!["document", r#"  code "a\n\nb""#, r#"  p "c""#]);
    }

    #[test]
    fn html_blocks_end_by_kind() {
        assert_eq!(
            shape("<div>\n*a*\n\nb"),
            vec!["document", r#"  html6 "<div>\n*a*""#, r#"  p "b""#]
        );
        assert_eq!(
            shape("<!-- x\n\ny -->\nz"),
            vec!["document", r#"  html2 "<!-- x\n\ny -->""#, r#"  p "z""#]
        );
        assert_eq!(shape("a\n<custom>\nb"), vec!["document", r#"  p "a\n<custom>\nb""#]);
    }

    #[test]
    fn reference_definitions_leave_the_tree() {
        let pipeline = Pipeline::commonmark();
        let document = crate::parse("[Foo]: /url \"t\"\n\n[foo]", &pipeline).unwrap();
        assert_eq!(document.children(document.root()).len(), 1);
        let definition: &LinkReferenceDefinition = document.link_reference("FOO").unwrap();
        assert_eq!(definition.url, "/url");
        assert_eq!(definition.title.as_deref(), Some("t"));
    }

    #[test]
    fn definition_only_paragraph_does_not_become_setext() {
        assert_eq!(shape("[a]: /u\n==="), vec!["document", r#"  p "===""#]);
        assert_eq!(shape("[a]: /u\n---"), vec!["document", "  hr"]);
    }

    #[test]
    fn list_marker_data_is_recorded() {
        let pipeline = Pipeline::commonmark();
        let document = crate::parse("3)  x", &pipeline).unwrap();
        let list = document.children(document.root())[0];
        match &document.block(list).kind {
            BlockKind::List(data) => {
                assert_eq!(data.marker, ListMarker::Ordered { start: 3, delimiter: ')' });
                assert_eq!(data.padding, 4);
            }
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[test]
    fn spans_cover_matched_lines() {
        let pipeline = Pipeline::commonmark();
        let text = "> a\n> b\n\nc";
        let document = crate::parse(text, &pipeline).unwrap();
        let quote = document.children(document.root())[0];
        let span = document.block(quote).span;
        assert_eq!(span.text(text), "> a\n> b");
        assert_eq!((span.line, span.column), (0, 0));
        let paragraph = document.children(document.root())[1];
        assert_eq!(document.block(paragraph).line(), 3);
    }
}
