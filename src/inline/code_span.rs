use super::{InlineParser, InlineProcessor};
use crate::ast::InlineKind;

/// Backtick code spans. A run without a closing run of the same length is literal.
#[derive(Debug, Default)]
pub struct CodeSpanParser;

/// Content of a code span: line endings become spaces, and one space is stripped from
/// each side when both sides have one and the content is not all spaces.
fn normalize_code(raw: &str) -> String {
    let content = raw.replace('\n', " ");
    let bytes = content.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b' ' && bytes[bytes.len() - 1] == b' ' && bytes.iter().any(|&b| b != b' ') {
        content[1..content.len() - 1].to_string()
    } else {
        content
    }
}

fn run_length(text: &str, at: usize) -> usize {
    text.as_bytes()[at..].iter().take_while(|&&b| b == b'`').count()
}

impl InlineParser for CodeSpanParser {
    fn name(&self) -> &'static str {
        "code_span"
    }

    fn opening_characters(&self) -> &[char] {
        &['`']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let buffer = processor.buffer();
        let start = processor.pos();
        let length = run_length(buffer, start);
        let content_start = start + length;

        // Look for a closing run of exactly the same length
        let mut i = content_start;
        while let Some(found) = buffer[i..].find('`') {
            let run_start = i + found;
            let run = run_length(buffer, run_start);
            if run == length {
                let code = normalize_code(&buffer[content_start..run_start]);
                let end = run_start + run;
                processor.push(InlineKind::Code(code), start, end);
                processor.set_pos(end);
                return true;
            }
            i = run_start + run;
        }

        let literal = buffer[start..content_start].to_string();
        processor.push_text(literal, start, content_start);
        processor.set_pos(content_start);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_code;

    #[test]
    fn code_content_normalization() {
        assert_eq!(normalize_code(" `` "), "``");
        assert_eq!(normalize_code("  a  "), " a ");
        assert_eq!(normalize_code("   "), "   ");
        assert_eq!(normalize_code("a\nb"), "a b");
        assert_eq!(normalize_code(" a"), " a");
    }
}
