use super::{InlineParser, InlineProcessor};
use crate::ast::InlineKind;
use crate::entity::decode_entity;

/// Named, decimal and hexadecimal character references.
#[derive(Debug, Default)]
pub struct EntityParser;

impl InlineParser for EntityParser {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn opening_characters(&self) -> &[char] {
        &['&']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let Some((text, len)) = decode_entity(processor.rest()) else {
            return false;
        };
        let raw = processor.rest()[..len].to_string();
        processor.push(InlineKind::Entity { raw, text }, start, start + len);
        processor.set_pos(start + len);
        true
    }
}
