//! Character references and backslash escapes.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// HTML5 named references that end in `;`, keyed with their `&` and `;`.
static NAMED: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    entities::ENTITIES
        .iter()
        .filter(|entity| entity.entity.ends_with(';'))
        .map(|entity| (entity.entity, entity.characters))
        .collect()
});

const MAX_NAME_LENGTH: usize = 32;

/// Decodes the character reference at the start of `text` (which begins with `&`).
///
/// Returns the decoded text and the number of bytes the reference occupies.
pub fn decode_entity(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }

    if bytes.get(1) == Some(&b'#') {
        let (radix, digits_start, max_digits) = match bytes.get(2) {
            Some(b'x') | Some(b'X') => (16, 3, 6),
            _ => (10, 2, 7),
        };
        let mut i = digits_start;
        while i < bytes.len() && i - digits_start < max_digits && (bytes[i] as char).is_digit(radix) {
            i += 1;
        }
        if i == digits_start || bytes.get(i) != Some(&b';') {
            return None;
        }
        let code = u32::from_str_radix(&text[digits_start..i], radix).ok()?;
        // NUL and invalid code points become the replacement character
        let ch = match code {
            0 => '\u{FFFD}',
            code => char::from_u32(code).unwrap_or('\u{FFFD}'),
        };
        return Some((ch.to_string(), i + 1));
    }

    let mut i = 1;
    while i < bytes.len() && i <= MAX_NAME_LENGTH && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == 1 || bytes.get(i) != Some(&b';') {
        return None;
    }
    NAMED
        .get(&text[..=i])
        .map(|decoded| (decoded.to_string(), i + 1))
}

/// Resolves backslash escapes and character references, as required for link
/// destinations, titles and info strings.
pub fn unescape(text: &str) -> String {
    if !text.contains(['\\', '&']) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        match c {
            '\\' => {
                let next = rest[1..].chars().next();
                match next {
                    Some(escaped) if escaped.is_ascii_punctuation() => {
                        out.push(escaped);
                        rest = &rest[2..];
                    }
                    _ => {
                        out.push('\\');
                        rest = &rest[1..];
                    }
                }
            }
            '&' => match decode_entity(rest) {
                Some((decoded, len)) => {
                    out.push_str(&decoded);
                    rest = &rest[len..];
                }
                None => {
                    out.push('&');
                    rest = &rest[1..];
                }
            },
            other => {
                out.push(other);
                rest = &rest[other.len_utf8()..];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_references() {
        assert_eq!(decode_entity("&amp; rest"), Some(("&".to_string(), 5)));
        assert_eq!(
            decode_entity("&ClockwiseContourIntegral;"),
            Some(("\u{2232}".to_string(), 26))
        );
        assert_eq!(decode_entity("&nosuchthing;"), None);
        assert_eq!(decode_entity("&amp"), None);
    }

    #[test]
    fn numeric_references() {
        assert_eq!(decode_entity("&#35;"), Some(("#".to_string(), 5)));
        assert_eq!(decode_entity("&#X22;"), Some(("\"".to_string(), 6)));
        assert_eq!(decode_entity("&#0;"), Some(("\u{FFFD}".to_string(), 4)));
        assert_eq!(decode_entity("&#87654321;"), None);
        assert_eq!(decode_entity("&#xD800;"), Some(("\u{FFFD}".to_string(), 8)));
    }

    #[test]
    fn unescape_mixes_escapes_and_references() {
        assert_eq!(unescape(r"f\*o&ouml;\q"), "f*oö\\q");
        assert_eq!(unescape("plain"), "plain");
    }
}
