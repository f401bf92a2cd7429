//! Raw HTML recognition shared by HTML blocks and inline HTML.

/// Tag names that start an HTML block of kind 6.
const BLOCK_TAGS: [&str; 62] = [
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// Tag names whose content is raw text (HTML block kind 1).
const RAW_TEXT_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len() && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

fn tag_name_len(bytes: &[u8]) -> usize {
    if !bytes.first().is_some_and(u8::is_ascii_alphabetic) {
        return 0;
    }
    1 + bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'-')
        .count()
}

/// Skips spaces, tabs and at most one line ending. Returns the new position and whether
/// anything was skipped.
fn skip_tag_whitespace(bytes: &[u8], mut i: usize) -> (usize, bool) {
    let start = i;
    let mut newline_seen = false;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' => i += 1,
            b'\n' | b'\r' if !newline_seen => {
                newline_seen = true;
                i += if bytes[i] == b'\r' && bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
            }
            _ => break,
        }
    }
    (i, i > start)
}

/// Length of an open tag at the start of `text`.
pub fn scan_open_tag(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let name = tag_name_len(&bytes[1..]);
    if name == 0 {
        return None;
    }
    let mut i = 1 + name;
    loop {
        let (after_space, had_space) = skip_tag_whitespace(bytes, i);
        match bytes.get(after_space) {
            Some(b'>') => return Some(after_space + 1),
            Some(b'/') if bytes.get(after_space + 1) == Some(&b'>') => return Some(after_space + 2),
            Some(&b) if had_space && (b.is_ascii_alphabetic() || b == b'_' || b == b':') => {
                i = after_space + 1;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'.' | b':' | b'-'))
                {
                    i += 1;
                }
                i = scan_attribute_value(bytes, i)?;
            }
            _ => return None,
        }
    }
}

/// Skips an optional `= value` after an attribute name.
fn scan_attribute_value(bytes: &[u8], start: usize) -> Option<usize> {
    let (i, _) = skip_tag_whitespace(bytes, start);
    if bytes.get(i) != Some(&b'=') {
        return Some(start);
    }
    let (i, _) = skip_tag_whitespace(bytes, i + 1);
    match bytes.get(i)? {
        quote @ (b'"' | b'\'') => {
            let close = bytes[i + 1..].iter().position(|b| b == quote)?;
            Some(i + 1 + close + 1)
        }
        _ => {
            let len = bytes[i..]
                .iter()
                .take_while(|b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'"' | b'\'' | b'=' | b'<' | b'>' | b'`'))
                .count();
            if len == 0 { None } else { Some(i + len) }
        }
    }
}

/// Length of a closing tag at the start of `text`.
pub fn scan_closing_tag(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if !text.starts_with("</") {
        return None;
    }
    let name = tag_name_len(&bytes[2..]);
    if name == 0 {
        return None;
    }
    let (i, _) = skip_tag_whitespace(bytes, 2 + name);
    if bytes.get(i) == Some(&b'>') { Some(i + 1) } else { None }
}

fn scan_until(text: &str, start: usize, terminator: &str) -> Option<usize> {
    text.get(start..)?
        .find(terminator)
        .map(|at| start + at + terminator.len())
}

/// Length of any inline HTML construct at the start of `text`: open or closing tag,
/// comment, processing instruction, declaration or CDATA section.
pub fn scan_inline_html(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    match bytes.get(1)? {
        b'!' => {
            if text.starts_with("<!--") {
                // <!--> and <!---> are complete comments
                if text[4..].starts_with('>') {
                    return Some(5);
                }
                if text[4..].starts_with("->") {
                    return Some(6);
                }
                scan_until(text, 4, "-->")
            } else if text.starts_with("<![CDATA[") {
                scan_until(text, 9, "]]>")
            } else if bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
                scan_until(text, 2, ">")
            } else {
                None
            }
        }
        b'?' => scan_until(text, 2, "?>"),
        b'/' => scan_closing_tag(text),
        _ => scan_open_tag(text),
    }
}

/// Kind (1-7) of the HTML block started by `line`, which begins at its first non-space
/// character.
pub fn block_start_kind(line: &str) -> Option<u8> {
    let bytes = line.as_bytes();
    if bytes.first() != Some(&b'<') {
        return None;
    }
    let ends_name = |at: usize| match bytes.get(at) {
        None => true,
        Some(b) => matches!(b, b' ' | b'\t' | b'>'),
    };

    for tag in RAW_TEXT_TAGS {
        if starts_with_ignore_case(&line[1..], tag) && ends_name(1 + tag.len()) {
            return Some(1);
        }
    }
    if line.starts_with("<!--") {
        return Some(2);
    }
    if line.starts_with("<?") {
        return Some(3);
    }
    if line.starts_with("<![CDATA[") {
        return Some(5);
    }
    if line.starts_with("<!") && bytes.get(2).is_some_and(u8::is_ascii_alphabetic) {
        return Some(4);
    }

    let name_start = if line.starts_with("</") { 2 } else { 1 };
    let name_len = tag_name_len(&bytes[name_start..]);
    if name_len > 0 {
        let name = &line[name_start..name_start + name_len];
        let after = name_start + name_len;
        if BLOCK_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name))
            && (ends_name(after) || line[after..].starts_with("/>"))
        {
            return Some(6);
        }
    }

    let name = &line[name_start..name_start + name_len];
    if RAW_TEXT_TAGS.iter().any(|tag| tag.eq_ignore_ascii_case(name)) {
        return None;
    }
    let tag_len = if name_start == 2 {
        scan_closing_tag(line)
    } else {
        scan_open_tag(line)
    }?;
    if line[tag_len..].bytes().all(|b| b == b' ' || b == b'\t') {
        Some(7)
    } else {
        None
    }
}

/// Whether `line` satisfies the end condition of an HTML block of kind 1-5.
pub fn block_end_condition(kind: u8, line: &str) -> bool {
    match kind {
        1 => {
            let lower = line.to_ascii_lowercase();
            RAW_TEXT_TAGS
                .iter()
                .any(|tag| lower.contains(&format!("</{tag}>")))
        }
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}
