//! Parser registries: which block and inline parsers run, in which order, with which
//! options.

use std::collections::HashSet;

use tracing::debug;

use crate::ast::Document;
use crate::block::{
    AtxHeadingParser, BlockParser, BlockProcessor, BlockQuoteParser, FencedCodeParser, HtmlBlockParser,
    IndentedCodeParser, ListParser, ParagraphParser, SetextHeadingParser, ThematicBreakParser,
};
use crate::error::ParseError;
use crate::inline::{
    AutolinkParser, CodeSpanParser, EmphasisParser, EntityParser, EscapeParser, InlineParser, InlineParserTable,
    LineBreakParser, LinkCloseParser, LinkOpenParser,
};
use crate::options::ParseOptions;

/// A frozen set of parsers. Immutable once built, so one pipeline can parse many
/// documents from many threads.
#[derive(Debug)]
pub struct Pipeline {
    block_parsers: Vec<Box<dyn BlockParser>>,
    inline_parsers: InlineParserTable,
    options: ParseOptions,
}

impl Pipeline {
    /// The CommonMark block and inline parsers with default options.
    pub fn commonmark() -> Self {
        PipelineBuilder::commonmark().assemble()
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::commonmark()
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Block parser names in priority order.
    pub fn block_parser_names(&self) -> Vec<&'static str> {
        self.block_parsers.iter().map(|parser| parser.name()).collect()
    }

    pub fn inline_parser_names(&self) -> Vec<&'static str> {
        self.inline_parsers.parsers().iter().map(|parser| parser.name()).collect()
    }

    /// Parses `text`: the whole block structure first, then the inline content of every
    /// leaf, so references defined anywhere are visible to every leaf.
    pub fn parse<'a>(&self, text: &'a str) -> Result<Document<'a>, ParseError> {
        let mut document = BlockProcessor::new(text, &self.block_parsers, &self.options).run()?;
        debug!(
            "{} link reference definitions collected",
            document.link_references().len()
        );

        let leaves: Vec<_> = document
            .descendants()
            .into_iter()
            .filter(|&id| {
                let block = document.block(id);
                !block.kind.is_container() && !block.no_inline && !block.lines().is_empty()
            })
            .collect();
        for leaf in leaves {
            crate::inline::parse_leaf(&mut document, leaf, &self.inline_parsers, &self.options)?;
        }
        Ok(document)
    }
}

/// Mutable setup phase of a [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    block_parsers: Vec<Box<dyn BlockParser>>,
    inline_parsers: Vec<Box<dyn InlineParser>>,
    options: ParseOptions,
}

impl PipelineBuilder {
    /// No parsers at all.
    pub fn empty() -> Self {
        PipelineBuilder::default()
    }

    /// The CommonMark parsers in their priority order.
    pub fn commonmark() -> Self {
        PipelineBuilder {
            block_parsers: vec![
                Box::new(BlockQuoteParser),
                Box::new(AtxHeadingParser),
                Box::new(FencedCodeParser),
                Box::new(HtmlBlockParser),
                Box::new(SetextHeadingParser),
                Box::new(ThematicBreakParser),
                Box::new(ListParser),
                Box::new(IndentedCodeParser),
                Box::new(ParagraphParser),
            ],
            inline_parsers: vec![
                Box::new(EscapeParser),
                Box::new(EntityParser),
                Box::new(CodeSpanParser),
                Box::new(AutolinkParser),
                Box::new(LineBreakParser),
                Box::new(EmphasisParser),
                Box::new(LinkOpenParser),
                Box::new(LinkCloseParser),
            ],
            options: ParseOptions::default(),
        }
    }

    /// Appends a block parser with the lowest priority.
    pub fn add_block_parser(mut self, parser: impl BlockParser + 'static) -> Self {
        self.block_parsers.push(Box::new(parser));
        self
    }

    /// Inserts a block parser just ahead of the one named `before`.
    pub fn insert_block_parser_before(
        mut self,
        before: &str,
        parser: impl BlockParser + 'static,
    ) -> Result<Self, ParseError> {
        let index = self
            .block_parsers
            .iter()
            .position(|existing| existing.name() == before)
            .ok_or_else(|| ParseError::UnknownParser(before.to_string()))?;
        self.block_parsers.insert(index, Box::new(parser));
        Ok(self)
    }

    pub fn remove_block_parser(mut self, name: &str) -> Result<Self, ParseError> {
        let before = self.block_parsers.len();
        self.block_parsers.retain(|parser| parser.name() != name);
        if self.block_parsers.len() == before {
            return Err(ParseError::UnknownParser(name.to_string()));
        }
        Ok(self)
    }

    pub fn add_inline_parser(mut self, parser: impl InlineParser + 'static) -> Self {
        self.inline_parsers.push(Box::new(parser));
        self
    }

    pub fn remove_inline_parser(mut self, name: &str) -> Result<Self, ParseError> {
        let before = self.inline_parsers.len();
        self.inline_parsers.retain(|parser| parser.name() != name);
        if self.inline_parsers.len() == before {
            return Err(ParseError::UnknownParser(name.to_string()));
        }
        Ok(self)
    }

    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Freezes the registries. Each parser name may appear once per registry.
    pub fn build(self) -> Result<Pipeline, ParseError> {
        let mut seen = HashSet::new();
        for name in self.block_parsers.iter().map(|parser| parser.name()) {
            if !seen.insert(name) {
                return Err(ParseError::DuplicateParser(name));
            }
        }
        seen.clear();
        for name in self.inline_parsers.iter().map(|parser| parser.name()) {
            if !seen.insert(name) {
                return Err(ParseError::DuplicateParser(name));
            }
        }
        Ok(self.assemble())
    }

    fn assemble(self) -> Pipeline {
        Pipeline {
            block_parsers: self.block_parsers,
            inline_parsers: InlineParserTable::new(self.inline_parsers),
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BlockId, BlockKind};
    use crate::block::{BlockProcessor, BlockState};
    use crate::inline::InlineProcessor;

    /// `:::` lines open and close a container.
    #[derive(Debug)]
    struct FenceContainer;

    impl BlockParser for FenceContainer {
        fn name(&self) -> &'static str {
            "fence_container"
        }

        fn opening_characters(&self) -> &[char] {
            &[':']
        }

        fn opens_containers(&self) -> bool {
            true
        }

        fn try_open(&self, processor: &mut BlockProcessor<'_, '_>) -> BlockState {
            if processor.cursor().rest_from_nonspace().trim_end() != ":::" {
                return BlockState::None;
            }
            processor.advance_to_nonspace();
            processor.advance(3, false);
            processor.open_block(BlockKind::Custom {
                name: "fence_container",
                container: true,
            });
            BlockState::Continue
        }

        fn try_continue(&self, processor: &mut BlockProcessor<'_, '_>, _block: BlockId) -> BlockState {
            if processor.cursor().rest_from_nonspace().trim_end() == ":::" {
                BlockState::Discard
            } else {
                BlockState::Continue
            }
        }
    }

    /// `@name` mentions.
    #[derive(Debug)]
    struct Mention;

    impl InlineParser for Mention {
        fn name(&self) -> &'static str {
            "mention"
        }

        fn opening_characters(&self) -> &[char] {
            &['@']
        }

        fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
            let start = processor.pos();
            let len = 1 + processor.rest()[1..]
                .bytes()
                .take_while(u8::is_ascii_alphanumeric)
                .count();
            if len == 1 {
                return false;
            }
            let text = processor.rest()[1..len].to_string();
            processor.push(crate::ast::InlineKind::Custom { name: "mention", text }, start, start + len);
            processor.set_pos(start + len);
            true
        }
    }

    /// Claims to match without consuming anything.
    #[derive(Debug)]
    struct Stuck;

    impl InlineParser for Stuck {
        fn name(&self) -> &'static str {
            "stuck"
        }

        fn opening_characters(&self) -> &[char] {
            &['x']
        }

        fn try_match(&self, _processor: &mut InlineProcessor<'_>) -> bool {
            true
        }
    }

    #[test]
    fn default_priority_order() {
        let pipeline = Pipeline::commonmark();
        assert_eq!(
            pipeline.block_parser_names(),
            vec![
                "block_quote",
                "atx_heading",
                "fenced_code",
                "html_block",
                "setext_heading",
                "thematic_break",
                "list",
                "indented_code",
                "paragraph",
            ]
        );
    }

    #[test]
    fn custom_parsers_plug_in() {
        let pipeline = PipelineBuilder::commonmark()
            .insert_block_parser_before("paragraph", FenceContainer)
            .unwrap()
            .add_inline_parser(Mention)
            .build()
            .unwrap();
        let document = pipeline.parse(":::\nhi @bob\n:::\nafter").unwrap();
        assert_eq!(
            document.outline().to_string(),
            r#"(document (fence_container (paragraph "hi " (mention "bob"))) (paragraph "after"))"#
        );
    }

    #[test]
    fn registry_errors() {
        let duplicate = PipelineBuilder::commonmark().add_block_parser(ParagraphParser).build();
        assert!(matches!(duplicate, Err(ParseError::DuplicateParser("paragraph"))));

        let unknown = PipelineBuilder::commonmark().remove_inline_parser("strikethrough");
        assert!(matches!(unknown, Err(ParseError::UnknownParser(name)) if name == "strikethrough"));
    }

    #[test]
    fn contract_violations_are_reported() {
        let no_paragraphs = PipelineBuilder::commonmark()
            .remove_block_parser("paragraph")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            no_paragraphs.parse("# ok\n\ntext"),
            Err(ParseError::UnclaimedLine { line: 2 })
        ));

        let stuck = PipelineBuilder::commonmark().add_inline_parser(Stuck).build().unwrap();
        assert!(matches!(
            stuck.parse("abc x"),
            Err(ParseError::NoProgress { parser: "stuck", offset: 4 })
        ));
    }

    #[test]
    fn nesting_limit_stops_new_containers() {
        let pipeline = PipelineBuilder::commonmark()
            .options(ParseOptions {
                max_nesting_depth: 2,
                ..ParseOptions::default()
            })
            .build()
            .unwrap();
        let document = pipeline.parse("> > > a").unwrap();
        assert_eq!(
            document.outline().to_string(),
            r#"(document (block_quote (block_quote (paragraph "> a"))))"#
        );
    }
}
