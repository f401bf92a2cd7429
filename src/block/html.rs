use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind};
use crate::html::{block_end_condition, block_start_kind};

/// Raw HTML blocks, kinds 1-7 by their start condition.
#[derive(Debug, Default)]
pub struct HtmlBlockParser;

impl BlockParser for HtmlBlockParser {
    fn name(&self) -> &'static str {
        "html_block"
    }

    fn opening_characters(&self) -> &[char] {
        &['<']
    }

    fn can_interrupt(&self, processor: &BlockProcessor<'_, '_>) -> bool {
        block_start_kind(processor.cursor().rest_from_nonspace()) != Some(7)
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if processor.is_code_indent() {
            return BlockState::None;
        }
        let Some(kind) = block_start_kind(processor.cursor().rest_from_nonspace()) else {
            return BlockState::None;
        };
        let block = processor.open_block(BlockKind::HtmlBlock { kind });
        processor.block_mut(block).no_inline = true;
        // the line keeps its indentation
        if block_end_condition(kind, processor.cursor().rest()) {
            BlockState::BreakKeepLine
        } else {
            BlockState::Break
        }
    }

    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) -> BlockState {
        let BlockKind::HtmlBlock { kind } = processor.block(block).kind else {
            return BlockState::None;
        };
        match kind {
            6 | 7 if processor.is_blank() => BlockState::None,
            6 | 7 => BlockState::Break,
            _ if block_end_condition(kind, processor.cursor().rest()) => BlockState::BreakKeepLine,
            _ => BlockState::Break,
        }
    }
}
