use super::{BlockParser, BlockProcessor, BlockState};
use crate::ast::{BlockId, BlockKind, Document, ListData, ListMarker};
use crate::line::is_space_or_tab;

/// Bullet and ordered list items, and the lists that group them.
#[derive(Debug, Default)]
pub struct ListParser;

const MAX_ORDERED_DIGITS: usize = 9;

/// Marker at the start of `line` and its length in bytes. The marker must be followed
/// by a space, a tab or the end of the line.
fn parse_marker(line: &str) -> Option<(ListMarker, usize)> {
    let bytes = line.as_bytes();
    let (marker, length) = match *bytes.first()? {
        b @ (b'-' | b'+' | b'*') => (ListMarker::Bullet(b as char), 1),
        _ => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits == 0 || digits > MAX_ORDERED_DIGITS {
                return None;
            }
            let delimiter = match bytes.get(digits)? {
                b'.' => '.',
                b')' => ')',
                _ => return None,
            };
            let start = line[..digits].parse().ok()?;
            (ListMarker::Ordered { start, delimiter }, digits + 1)
        }
    };
    match bytes.get(length) {
        None => Some((marker, length)),
        Some(&b) if is_space_or_tab(b) => Some((marker, length)),
        Some(_) => None,
    }
}

/// Whether a trailing blank line ends `block` or its last nested list content.
fn ends_with_blank_line(document: &Document<'_>, block: BlockId) -> bool {
    let mut current = Some(block);
    while let Some(id) = current {
        let block = document.block(id);
        if block.last_line_blank {
            return true;
        }
        current = match block.kind {
            BlockKind::List(_) | BlockKind::ListItem(_) => block.children().last().copied(),
            _ => None,
        };
    }
    false
}

/// A list is loose if a blank line separates two of its items, or two blocks inside
/// one of its items.
fn is_tight(document: &Document<'_>, list: BlockId) -> bool {
    let items = document.children(list);
    for (i, &item) in items.iter().enumerate() {
        let has_next_item = i + 1 < items.len();
        if has_next_item && document.block(item).last_line_blank {
            return false;
        }
        let children = document.children(item);
        for (j, &child) in children.iter().enumerate() {
            if (has_next_item || j + 1 < children.len()) && ends_with_blank_line(document, child) {
                return false;
            }
        }
    }
    true
}

impl BlockParser for ListParser {
    fn name(&self) -> &'static str {
        "list"
    }

    fn opening_characters(&self) -> &[char] {
        &['-', '+', '*', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9']
    }

    fn opens_containers(&self) -> bool {
        true
    }

    /// Only applies to a paragraph that matched this line; a lazily open paragraph does
    /// not restrict which items may start.
    fn can_interrupt(&self, processor: &BlockProcessor<'_, '_>) -> bool {
        if processor.matched_paragraph().is_none() {
            return true;
        }
        let line = processor.cursor().rest_from_nonspace();
        match parse_marker(line) {
            Some((ListMarker::Ordered { start, .. }, _)) if start != 1 => false,
            Some((_, length)) => !line[length..].bytes().all(is_space_or_tab),
            None => false,
        }
    }

    fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
        let container = processor.container();
        let current_list = match processor.block(container).kind {
            BlockKind::List(data) => Some(data),
            _ => None,
        };
        if processor.is_code_indent() && current_list.is_none() {
            return BlockState::None;
        }
        let Some((marker, length)) = parse_marker(processor.cursor().rest_from_nonspace()) else {
            return BlockState::None;
        };
        let marker_offset = processor.indent();
        processor.advance_to_nonspace();
        processor.advance(length, false);

        // 1-4 columns of spaces set the content indent; none, 5 or more, or a blank rest
        // of line mean one column
        let saved = processor.cursor().clone();
        let start_column = saved.column();
        while processor.cursor().column() - start_column <= 5
            && processor.cursor().peek().is_some_and(is_space_or_tab)
        {
            processor.advance(1, true);
        }
        let spaces = processor.cursor().column() - start_column;
        let padding = if spaces >= 5 || spaces < 1 || processor.cursor().peek().is_none() {
            *processor.cursor_mut() = saved;
            if spaces > 0 {
                processor.advance(1, true);
            }
            length + 1
        } else {
            length + spaces
        };

        let data = ListData {
            marker,
            marker_offset,
            padding,
            tight: true,
        };
        if !current_list.is_some_and(|list| marker.continues(&list.marker)) {
            processor.open_block(BlockKind::List(data));
        }
        processor.open_block(BlockKind::ListItem(data));
        BlockState::Continue
    }

    fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) -> BlockState {
        let data = match processor.block(block).kind {
            BlockKind::List(_) => return BlockState::Continue,
            BlockKind::ListItem(data) => data,
            _ => return BlockState::None,
        };
        if processor.is_blank() {
            // an item may begin with at most one blank line
            if processor.block(block).children().is_empty() {
                return BlockState::None;
            }
            processor.advance_to_nonspace();
            BlockState::Continue
        } else if processor.indent() >= data.marker_offset + data.padding {
            processor.advance(data.marker_offset + data.padding, true);
            BlockState::Continue
        } else {
            BlockState::None
        }
    }

    fn close(&self, processor: &mut BlockProcessor<'_, '_>, block: BlockId) {
        if !matches!(processor.block(block).kind, BlockKind::List(_)) {
            return;
        }
        let tight = is_tight(processor.document(), block);
        let items = processor.block(block).children().to_vec();
        for id in std::iter::once(block).chain(items) {
            if let BlockKind::List(data) | BlockKind::ListItem(data) = &mut processor.block_mut(id).kind {
                data.tight = tight;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers() {
        assert_eq!(parse_marker("- a"), Some((ListMarker::Bullet('-'), 1)));
        assert_eq!(parse_marker("*"), Some((ListMarker::Bullet('*'), 1)));
        assert_eq!(
            parse_marker("12) x"),
            Some((ListMarker::Ordered { start: 12, delimiter: ')' }, 3))
        );
        assert_eq!(parse_marker("1234567890. x"), None);
        assert_eq!(parse_marker("-a"), None);
        assert_eq!(parse_marker("1,"), None);
    }
}
