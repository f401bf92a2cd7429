use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind, CodeBlockData, Fence};
use crate::entity::unescape;
use crate::line::{CODE_INDENT, is_space_or_tab};

/// Lines indented by four or more columns.
#[derive(Debug, Default)]
pub struct IndentedCodeParser;

/// Code between fences of three or more backticks or tildes.
#[derive(Debug, Default)]
pub struct FencedCodeParser;

impl BlockParser for IndentedCodeParser {
    fn name(&self) -> &'static str {
        "indented_code"
    }

    fn can_interrupt(&self, _processor: &BlockProcessor<'_, '_>) -> bool {
        false
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if !processor.is_code_indent() || processor.is_blank() {
            return BlockState::None;
        }
        processor.advance(CODE_INDENT, true);
        let block = processor.open_block(BlockKind::CodeBlock(CodeBlockData {
            fence: None,
            info: String::new(),
        }));
        processor.block_mut(block).no_inline = true;
        BlockState::Break
    }

    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        if processor.is_code_indent() {
            processor.advance(CODE_INDENT, true);
            BlockState::Break
        } else if processor.is_blank() {
            processor.advance_to_nonspace();
            BlockState::Break
        } else {
            BlockState::None
        }
    }

    fn close(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) {
        let source = processor.document().source();
        let lines = &mut processor.block_mut(block).lines;
        while lines
            .last()
            .is_some_and(|line| line.text(source).bytes().all(is_space_or_tab))
        {
            lines.pop();
        }
        if lines.is_empty() {
            processor.remove_block(block);
        }
    }
}

/// Fence character and run length at the start of `line`.
fn fence_run(line: &str) -> Option<(char, usize)> {
    let marker = line.bytes().next().filter(|b| matches!(b, b'`' | b'~'))?;
    let length = line.bytes().take_while(|&b| b == marker).count();
    (length >= 3).then_some((marker as char, length))
}

impl BlockParser for FencedCodeParser {
    fn name(&self) -> &'static str {
        "fenced_code"
    }

    fn opening_characters(&self) -> &[char] {
        &['`', '~']
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if processor.is_code_indent() {
            return BlockState::None;
        }
        let line = processor.cursor().rest_from_nonspace();
        let Some((character, length)) = fence_run(line) else {
            return BlockState::None;
        };
        let info = line[length..].trim_matches(|c| c == ' ' || c == '\t');
        if character == '`' && info.contains('`') {
            return BlockState::None;
        }
        let fence = Fence {
            character,
            length,
            indent: processor.indent(),
        };
        let block = processor.open_block(BlockKind::CodeBlock(CodeBlockData {
            fence: Some(fence),
            info: unescape(info),
        }));
        processor.block_mut(block).no_inline = true;
        BlockState::Continue
    }

    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) -> BlockState {
        let BlockKind::CodeBlock(CodeBlockData { fence: Some(fence), .. }) = processor.block(block).kind else {
            return BlockState::None;
        };
        if !processor.is_code_indent() {
            let line = processor.cursor().rest_from_nonspace();
            if let Some((character, length)) = fence_run(line)
                && character == fence.character
                && length >= fence.length
                && line[length..].bytes().all(is_space_or_tab)
            {
                return BlockState::Discard;
            }
        }
        let mut remaining = fence.indent;
        while remaining > 0 && processor.cursor().peek().is_some_and(is_space_or_tab) {
            processor.advance(1, true);
            remaining -= 1;
        }
        BlockState::Break
    }
}

#[cfg(test)]
mod tests {
    use super::fence_run;

    #[test]
    fn fence_runs() {
        assert_eq!(fence_run("```rust"), Some(('`', 3)));
        assert_eq!(fence_run("~~~~"), Some(('~', 4)));
        assert_eq!(fence_run("``"), None);
        assert_eq!(fence_run("***"), None);
    }
}
