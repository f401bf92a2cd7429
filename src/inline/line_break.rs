use super::{InlineParser, InlineProcessor};
use crate::ast::InlineKind;

/// Line endings inside a leaf: hard after two or more spaces, soft otherwise.
#[derive(Debug, Default)]
pub struct LineBreakParser;

/// Skips the spaces and tabs that start a continuation line.
pub(crate) fn skip_leading_spaces(processor: &mut InlineProcessor<'_>) {
    let skipped = processor
        .rest()
        .bytes()
        .take_while(|&b| b == b' ' || b == b'\t')
        .count();
    processor.set_pos(processor.pos() + skipped);
}

impl InlineParser for LineBreakParser {
    fn name(&self) -> &'static str {
        "line_break"
    }

    fn opening_characters(&self) -> &[char] {
        &['\n']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let before = &processor.buffer()[..start];
        let hard = before.ends_with("  ");
        let trailing = before.len() - before.trim_end_matches(' ').len();
        processor.push(InlineKind::LineBreak { hard }, start - trailing, start + 1);
        processor.set_pos(start + 1);
        skip_leading_spaces(processor);
        true
    }
}
