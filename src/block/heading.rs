use super::{BlockParser, BlockProcessor, BlockState, extract_link_references};
use crate::ast::{BlockId, BlockKind};
use crate::line::is_space_or_tab;

/// `#` headings, levels 1-6.
#[derive(Debug, Default)]
pub struct AtxHeadingParser;

/// `=` and `-` underlines that turn the paragraph above into a heading.
#[derive(Debug, Default)]
pub struct SetextHeadingParser;

/// Byte range of an ATX heading's content within `line`, which starts at its hashes.
/// The optional closing sequence and surrounding whitespace are excluded.
fn atx_content(line: &str, level: usize) -> (usize, usize) {
    let bytes = line.as_bytes();
    let mut start = level;
    while start < bytes.len() && is_space_or_tab(bytes[start]) {
        start += 1;
    }
    let mut end = bytes.len();
    while end > start && is_space_or_tab(bytes[end - 1]) {
        end -= 1;
    }
    let mut hashes = end;
    while hashes > start && bytes[hashes - 1] == b'#' {
        hashes -= 1;
    }
    if hashes == start {
        end = start;
    } else if hashes < end && is_space_or_tab(bytes[hashes - 1]) {
        end = hashes;
        while end > start && is_space_or_tab(bytes[end - 1]) {
            end -= 1;
        }
    }
    (start, end)
}

fn setext_level(line: &str) -> Option<u8> {
    let marker = line.bytes().next()?;
    let level = match marker {
        b'=' => 1,
        b'-' => 2,
        _ => return None,
    };
    let run = line.bytes().take_while(|&b| b == marker).count();
    line[run..]
        .bytes()
        .all(is_space_or_tab)
        .then_some(level)
}

impl BlockParser for AtxHeadingParser {
    fn name(&self) -> &'static str {
        "atx_heading"
    }

    fn opening_characters(&self) -> &[char] {
        &['#']
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        if processor.is_code_indent() {
            return BlockState::None;
        }
        let line = processor.cursor().rest_from_nonspace();
        let level = line.bytes().take_while(|&b| b == b'#').count();
        if !(1..=6).contains(&level) || line.as_bytes().get(level).is_some_and(|&b| !is_space_or_tab(b)) {
            return BlockState::None;
        }
        let base = processor.cursor().first_nonspace();
        let (start, end) = atx_content(line, level);
        let heading = processor.open_block(BlockKind::Heading {
            level: level as u8,
            setext: false,
        });
        if start < end {
            processor.append_range(heading, base + start, base + end);
        }
        BlockState::Discard
    }

    fn try_continue(&self, _processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        BlockState::None
    }
}

impl BlockParser for SetextHeadingParser {
    fn name(&self) -> &'static str {
        "setext_heading"
    }

    fn opening_characters(&self) -> &[char] {
        &['=', '-']
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        let Some(paragraph) = processor.matched_paragraph() else {
            return BlockState::None;
        };
        if processor.is_code_indent() {
            return BlockState::None;
        }
        let Some(level) = setext_level(processor.cursor().rest_from_nonspace()) else {
            return BlockState::None;
        };
        // definitions are not heading content; with nothing else left this is no underline
        if !extract_link_references(processor, paragraph) {
            return BlockState::None;
        }
        processor.convert_block(paragraph, BlockKind::Heading { level, setext: true });
        BlockState::Discard
    }

    fn try_continue(&self, _processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
        BlockState::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(line: &str) -> &str {
        let level = line.bytes().take_while(|&b| b == b'#').count();
        let (start, end) = atx_content(line, level);
        &line[start..end]
    }

    #[test]
    fn closing_sequences_are_removed() {
        assert_eq!(content("# foo"), "foo");
        assert_eq!(content("## foo ##   "), "foo");
        assert_eq!(content("### foo ### b"), "foo ### b");
        assert_eq!(content("# foo#"), "foo#");
        assert_eq!(content("### foo \\###"), "foo \\###");
        assert_eq!(content("## #"), "");
        assert_eq!(content("#"), "");
    }

    #[test]
    fn underlines() {
        assert_eq!(setext_level("==="), Some(1));
        assert_eq!(setext_level("-   "), Some(2));
        assert_eq!(setext_level("= ="), None);
        assert_eq!(setext_level("--a"), None);
    }
}
