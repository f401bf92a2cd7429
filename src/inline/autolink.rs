use super::{InlineParser, InlineProcessor};
use crate::ast::InlineKind;
use crate::html::scan_inline_html;

/// `<...>` constructs: URI and e-mail autolinks, then raw inline HTML.
#[derive(Debug, Default)]
pub struct AutolinkParser;

/// Length of `scheme:rest` before the closing `>`. `text` starts after the `<`.
fn scan_uri(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if !bytes.first()?.is_ascii_alphabetic() {
        return None;
    }
    let scheme = 1 + bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-'))
        .count();
    if !(2..=32).contains(&scheme) || bytes.get(scheme) != Some(&b':') {
        return None;
    }
    let mut i = scheme + 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'>' => return Some(i),
            b'<' => return None,
            b if b <= b' ' || b == 0x7f => return None,
            _ => i += 1,
        }
    }
    None
}

/// Length of `local@domain` before the closing `>`. `text` starts after the `<`.
fn scan_email(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let local = bytes
        .iter()
        .take_while(|&&b| b.is_ascii_alphanumeric() || b".!#$%&'*+/=?^_`{|}~-".contains(&b))
        .count();
    if local == 0 || bytes.get(local) != Some(&b'@') {
        return None;
    }
    let mut i = local + 1;
    loop {
        // Each domain label is 1-63 characters and neither starts nor ends with `-`
        let label = bytes[i..]
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
            .count();
        if label == 0 || label > 63 || bytes[i] == b'-' || bytes[i + label - 1] == b'-' {
            return None;
        }
        i += label;
        match bytes.get(i) {
            Some(b'.') => i += 1,
            Some(b'>') => return Some(i),
            _ => return None,
        }
    }
}

impl InlineParser for AutolinkParser {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn opening_characters(&self) -> &[char] {
        &['<']
    }

    fn try_match(&self, processor: &mut InlineProcessor<'_>) -> bool {
        let start = processor.pos();
        let inner = &processor.rest()[1..];
        let (kind, len) = if let Some(len) = scan_uri(inner) {
            let text = inner[..len].to_string();
            let kind = InlineKind::Autolink {
                url: text.clone(),
                text,
                email: false,
            };
            (kind, len + 2)
        } else if let Some(len) = scan_email(inner) {
            let text = inner[..len].to_string();
            let kind = InlineKind::Autolink {
                url: format!("mailto:{text}"),
                text,
                email: true,
            };
            (kind, len + 2)
        } else if let Some(len) = scan_inline_html(processor.rest()) {
            (InlineKind::Html(processor.rest()[..len].to_string()), len)
        } else {
            return false;
        };
        processor.push(kind, start, start + len);
        processor.set_pos(start + len);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uris() {
        assert_eq!(scan_uri("http://a.b/c?d>"), Some(14));
        assert_eq!(scan_uri("a+b+c:d>"), Some(7));
        assert_eq!(scan_uri("m:abc>"), None);
        assert_eq!(scan_uri("http://a b>"), None);
        assert_eq!(scan_uri("localhost:5001/foo>"), Some(18));
    }

    #[test]
    fn emails() {
        assert_eq!(scan_email("foo@bar.example.com>"), Some(19));
        assert_eq!(scan_email("foo+special@Bar.baz-bar0.com>"), Some(28));
        assert_eq!(scan_email("foo@-bar.com>"), None);
        assert_eq!(scan_email("foo\\+@bar.example.com>"), None);
    }
}
