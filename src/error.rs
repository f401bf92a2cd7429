use thiserror::Error;

/// Contract violations raised while building a pipeline or parsing.
///
/// Markdown itself has no syntax errors; malformed constructs degrade to literal text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("block parser `{parser}` matched line {line} without opening a block")]
    MissingBlock { parser: &'static str, line: usize },

    #[error("no block parser claimed non-blank line {line}")]
    UnclaimedLine { line: usize },

    #[error("inline parser `{parser}` matched without consuming input at offset {offset}")]
    NoProgress { parser: &'static str, offset: usize },

    #[error("parser `{0}` is registered twice")]
    DuplicateParser(&'static str),

    #[error("no parser named `{0}` is registered")]
    UnknownParser(String),

    #[error("invalid parse options: {0}")]
    InvalidOptions(#[from] serde_json::Error),
}
