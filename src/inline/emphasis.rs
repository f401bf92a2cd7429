//! `*` and `_` delimiter runs and their resolution into emphasis.

use std::collections::HashMap;

use super::{InlineParser, InlineProcessor, is_flanking_punctuation, is_flanking_whitespace};
use crate::ast::{Delimiter, DelimiterKind, DelimiterType, InlineArena, InlineId, InlineKind};
use crate::span::Span;

#[derive(Debug, Default)]
pub struct EmphasisParser;

impl InlineParser for EmphasisParser {
    fn name(&self) -> &'static str {
        "emphasis"
    }

    fn opening_characters(&self) -> &[char] {
        &['*', '_']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let Some(character) = processor.peek() else {
            return false;
        };
        let length = processor.rest().chars().take_while(|&c| c == character).count();
        let end = start + length;

        // The start and end of the leaf count as whitespace
        let before = processor.previous_char().unwrap_or('\n');
        let after = processor.buffer()[end..].chars().next().unwrap_or('\n');
        let left = is_left_flanking(before, after);
        let right = is_left_flanking(after, before);
        let (can_open, can_close) = if character == '_' {
            (
                left && (!right || is_flanking_punctuation(before)),
                right && (!left || is_flanking_punctuation(after)),
            )
        } else {
            (left, right)
        };

        processor.set_pos(end);
        match DelimiterType::from_flanking(can_open, can_close) {
            Some(delimiter_type) => {
                let delimiter = Delimiter {
                    kind: DelimiterKind::Emphasis,
                    character,
                    delimiter_type,
                    active: true,
                    length,
                    original_length: length,
                    position: start,
                };
                processor.push(InlineKind::Delimiter(delimiter), start, end);
            }
            None => {
                let literal = processor.buffer()[start..end].to_string();
                processor.push_text(literal, start, end);
            }
        }
        true
    }
}

/// A run is left-flanking when it is not followed by whitespace, and is either not
/// followed by punctuation or preceded by whitespace or punctuation. Swapping the
/// arguments gives right-flanking.
fn is_left_flanking(before: char, after: char) -> bool {
    if is_flanking_whitespace(after) {
        return false;
    }
    !is_flanking_punctuation(after) || is_flanking_whitespace(before) || is_flanking_punctuation(before)
}

fn delimiter(arena: &InlineArena, id: InlineId) -> Option<&Delimiter> {
    arena.get(id).delimiter()
}

/// Replaces a delimiter node with the literal text of its remaining run.
fn to_literal(arena: &mut InlineArena, id: InlineId) {
    let node = arena.get_mut(id);
    if let Some(literal) = node.delimiter().map(Delimiter::literal) {
        node.kind = InlineKind::Text(literal);
    }
}

/// Pairs the emphasis delimiters among the direct children of `container`, innermost
/// closers first, and turns whatever is left into literal text.
pub(crate) fn process_emphasis(arena: &mut InlineArena, container: InlineId) {
    let mut stack: Vec<Option<InlineId>> = arena
        .children(container)
        .filter(|&id| delimiter(arena, id).is_some_and(|d| d.kind == DelimiterKind::Emphasis))
        .map(Some)
        .collect();
    // lowest stack index worth searching for an opener, per (character, closer can
    // open, closer length mod 3)
    let mut openers_bottom: HashMap<(char, bool, usize), usize> = HashMap::new();

    let mut closer = 0;
    while closer < stack.len() {
        let Some(closer_id) = stack[closer] else {
            closer += 1;
            continue;
        };
        let Some(close) = delimiter(arena, closer_id).cloned() else {
            closer += 1;
            continue;
        };
        if !close.delimiter_type.can_close() {
            closer += 1;
            continue;
        }

        let key = (close.character, close.delimiter_type.can_open(), close.original_length % 3);
        let bottom = openers_bottom.get(&key).copied().unwrap_or(0);
        let mut opener = None;
        let mut rule_of_three = false;
        let mut index = closer;
        while index > bottom {
            index -= 1;
            let Some(open) = stack[index].and_then(|id| delimiter(arena, id)) else {
                continue;
            };
            if open.character != close.character || !open.delimiter_type.can_open() {
                continue;
            }
            // Runs that can both open and close only pair when their summed lengths
            // are not a multiple of 3, unless both lengths are
            let sum = open.original_length + close.original_length;
            let odd_match = (close.delimiter_type.can_open() || open.delimiter_type.can_close())
                && sum % 3 == 0
                && !(open.original_length % 3 == 0 && close.original_length % 3 == 0);
            if odd_match {
                rule_of_three = true;
                continue;
            }
            opener = Some(index);
            break;
        }

        match opener {
            Some(opener) => {
                // Unpaired delimiters between the two are plain text now
                for slot in &mut stack[opener + 1..closer] {
                    if let Some(id) = slot.take() {
                        to_literal(arena, id);
                    }
                }
                let Some(opener_id) = stack[opener] else {
                    closer += 1;
                    continue;
                };
                let (opener_left, closer_left) = insert_emphasis(arena, opener_id, closer_id);
                if opener_left == 0 {
                    stack[opener] = None;
                }
                if closer_left == 0 {
                    stack[closer] = None;
                    closer += 1;
                }
            }
            None => {
                if !rule_of_three {
                    openers_bottom.insert(key, closer);
                }
                if !close.delimiter_type.can_open() {
                    stack[closer] = None;
                    to_literal(arena, closer_id);
                }
                closer += 1;
            }
        }
    }

    for id in stack.into_iter().flatten() {
        to_literal(arena, id);
    }
}

/// Wraps everything between `opener` and `closer` in an emphasis node using one or
/// two characters of each run. Returns the characters left in each run; exhausted
/// runs are removed from the tree.
fn insert_emphasis(arena: &mut InlineArena, opener: InlineId, closer: InlineId) -> (usize, usize) {
    let (Some(open), Some(close)) = (delimiter(arena, opener).cloned(), delimiter(arena, closer).cloned()) else {
        return (0, 0);
    };
    let used = if open.length >= 2 && close.length >= 2 { 2 } else { 1 };
    let opener_left = open.length - used;
    let closer_left = close.length - used;

    let opener_span = arena.get(opener).span;
    let closer_span = arena.get(closer).span;
    let span = Span::new(
        opener_span.end - used,
        closer_span.start + used,
        opener_span.line,
        opener_span.column + opener_left,
    );
    let emphasis = arena.alloc(
        InlineKind::Emphasis {
            delimiter: open.character,
            strong: used == 2,
        },
        span,
        true,
    );
    arena.move_between(opener, closer, emphasis);
    arena.insert_after(opener, emphasis);

    let node = arena.get_mut(opener);
    node.span.shrink_end(used);
    if let Some(delimiter) = node.delimiter_mut() {
        delimiter.length = opener_left;
    }
    let node = arena.get_mut(closer);
    node.span.shrink_start(used);
    if let Some(delimiter) = node.delimiter_mut() {
        delimiter.length = closer_left;
    }

    if opener_left == 0 {
        arena.detach(opener);
    }
    if closer_left == 0 {
        arena.detach(closer);
    }
    (opener_left, closer_left)
}
