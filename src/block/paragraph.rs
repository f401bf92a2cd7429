use tracing::{debug, trace};

use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind, LinkReferenceDefinition};
use crate::link_syntax::parse_reference_definition;
use crate::span::Span;

/// Fallback leaf: any non-blank line not claimed by another parser.
#[derive(Debug, Default)]
pub struct ParagraphParser;

/// Parses link reference definitions from the start of a paragraph, registers them and
/// drops the lines they occupied.
///
/// Returns whether the paragraph still has content.
pub fn extract_link_references(processor: &mut BlockProcessor<'_, '_>, paragraph: BlockId) -> bool {
    let text = processor.document().leaf_text(paragraph);
    let max_label = processor.options().max_link_label_length;
    let max_parens = processor.options().max_parenthesis_nesting;

    let mut consumed = 0;
    let mut dropped = 0;
    while text[consumed..].starts_with('[') {
        let Some(definition) = parse_reference_definition(&text[consumed..], max_label, max_parens) else {
            break;
        };
        consumed += definition.len;
        let first_line = dropped;
        dropped = text[..consumed].matches('\n').count() + usize::from(consumed == text.len());

        let lines = processor.block(paragraph).lines();
        let (first, last) = (lines[first_line].span, lines[dropped - 1].span);
        let span = Span::new(first.start, last.end, first.line, first.column);
        let registered = processor.document_mut().add_link_reference(LinkReferenceDefinition {
            label: definition.label,
            url: definition.url,
            title: definition.title,
            span,
        });
        if registered {
            debug!("link reference defined at line {}", span.line);
        } else {
            trace!("duplicate link reference at line {} ignored", span.line);
        }
    }

    let block = processor.block_mut(paragraph);
    if dropped > 0 {
        block.lines.drain(..dropped);
        if let Some(first) = block.lines.first() {
            block.span.start = first.span.start;
            block.span.line = first.span.line;
            block.span.column = first.span.column;
        }
    }
    !block.lines.is_empty()
}

impl BlockParser for ParagraphParser {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if processor.is_blank() {
            return BlockState::None;
        }
        processor.advance_to_nonspace();
        processor.open_block(BlockKind::Paragraph);
        BlockState::Break
    }

    /// Only matches. The line itself is claimed in the open phase, through `try_open`
    /// above, once every parser that may interrupt a paragraph has declined it.
    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        if processor.is_blank() {
            BlockState::None
        } else {
            BlockState::Continue
        }
    }

    fn close(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) {
        if processor.block(block).kind.is_paragraph() && !extract_link_references(processor, block) {
            processor.remove_block(block);
        }
    }
}
