/// A CommonMark parsing core: block structure, inline content and link resolution
/// into a source-mapped document tree
pub mod ast;
pub mod block;
pub mod entity;
pub mod error;
pub mod html;
pub mod inline;
pub mod line;
pub mod link_syntax;
pub mod options;
pub mod pipeline;
pub mod span;
pub mod visitor;

use once_cell::sync::Lazy;

pub use ast::Document;
pub use error::ParseError;
pub use options::ParseOptions;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use visitor::{NodeRef, NodeType, Outline, Visitor};

static COMMONMARK: Lazy<Pipeline> = Lazy::new(Pipeline::commonmark);

/// Parse `text` with the parsers and options of `pipeline`
pub fn parse<'a>(text: &'a str, pipeline: &Pipeline) -> Result<Document<'a>, ParseError> {
    pipeline.parse(text)
}

/// Parse `text` with the default CommonMark pipeline
pub fn parse_document(text: &str) -> Result<Document<'_>, ParseError> {
    COMMONMARK.parse(text)
}
