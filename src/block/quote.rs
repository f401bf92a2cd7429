use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind};

/// `>` followed by an optional space, which may be half of a tab.
#[derive(Debug, Default)]
pub struct BlockQuoteParser;

impl BlockQuoteParser {
    fn consume_marker(processor: &mut BlockProcessor<'_, '_>) -> bool {
        if processor.is_code_indent() || processor.peek_nonspace() != Some('>') {
            return false;
        }
        processor.advance_to_nonspace();
        processor.advance(1, false);
        if matches!(processor.cursor().peek(), Some(b' ' | b'\t')) {
            processor.advance(1, true);
        }
        true
    }
}

impl BlockParser for BlockQuoteParser {
    fn name(&self) -> &'static str {
        "block_quote"
    }

    fn opening_characters(&self) -> &[char] {
        &['>']
    }

    fn opens_containers(&self) -> bool {
        true
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if !Self::consume_marker(processor) {
            return BlockState::None;
        }
        processor.open_block(BlockKind::BlockQuote);
        BlockState::Continue
    }

    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        if Self::consume_marker(processor) {
            BlockState::Continue
        } else {
            BlockState::None
        }
    }
}
