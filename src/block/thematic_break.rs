use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind};
use crate::line::is_space_or_tab;

/// Three or more `*`, `-` or `_`, optionally separated by spaces or tabs.
#[derive(Debug, Default)]
pub struct ThematicBreakParser;

pub(crate) fn is_thematic_break(line: &str) -> bool {
    let Some(marker) = line.bytes().next().filter(|b| matches!(b, b'*' | b'-' | b'_')) else {
        return false;
    };
    let mut count = 0;
    for b in line.bytes() {
        if b == marker {
            count += 1;
        } else if !is_space_or_tab(b) {
            return false;
        }
    }
    count >= 3
}

impl BlockParser for ThematicBreakParser {
    fn name(&self) -> &'static str {
        "thematic_break"
    }

    fn opening_characters(&self) -> &[char] {
        &['*', '-', '_']
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if processor.is_code_indent() || !is_thematic_break(processor.cursor().rest_from_nonspace()) {
            return BlockState::None;
        }
        processor.open_block(BlockKind::ThematicBreak);
        BlockState::Discard
    }

    fn try_continue(&self, _processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        BlockState::None
    }
}
