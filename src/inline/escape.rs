use super::{InlineParser, InlineProcessor};
use crate::ast::InlineKind;

/// Backslash escapes: `\` before ASCII punctuation is literal, before a line ending it
/// is a hard break.
#[derive(Debug, Default)]
pub struct EscapeParser;

impl InlineParser for EscapeParser {
    fn name(&self) -> &'static str {
        "escape"
    }

    fn opening_characters(&self) -> &[char] {
        &['\\']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let Some(next) = processor.rest()[1..].chars().next() else {
            return false;
        };
        if next == '\n' {
            processor.push(InlineKind::LineBreak { hard: true }, start, start + 2);
            processor.set_pos(start + 2);
            super::line_break::skip_leading_spaces(processor);
            true
        } else if next.is_ascii_punctuation() {
            processor.push_text(next, start, start + 2);
            processor.set_pos(start + 2);
            true
        } else {
            false
        }
    }
}
