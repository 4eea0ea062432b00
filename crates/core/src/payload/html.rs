//! Minimal element surgery on a trusted page template.

/// Byte offsets of one element: `<tag ...>inner</tag>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ElementSpan {
    pub start: usize,
    pub inner_start: usize,
    pub inner_end: usize,
    pub end: usize,
}

/// Escape text for use as element content.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Locate the element carrying `id`, including its matching close tag.
pub(crate) fn find_element(html: &str, id: &str) -> Option<ElementSpan> {
    let attr_pos = [format!("id=\"{}\"", id), format!("id='{}'", id)]
        .iter()
        .find_map(|needle| html.find(needle.as_str()))?;

    let start = html[..attr_pos].rfind('<')?;
    let tag: String = html[start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if tag.is_empty() {
        return None;
    }
    let inner_start = attr_pos + html[attr_pos..].find('>')? + 1;

    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    let mut depth = 1usize;
    let mut cursor = inner_start;

    while let Some(offset) = html[cursor..].find('<') {
        let pos = cursor + offset;
        let rest = &html[pos..];
        if rest.starts_with(&close) && is_tag_boundary(rest, close.len()) {
            depth -= 1;
            let close_end = pos + rest.find('>')? + 1;
            if depth == 0 {
                return Some(ElementSpan {
                    start,
                    inner_start,
                    inner_end: pos,
                    end: close_end,
                });
            }
            cursor = close_end;
        } else {
            if rest.starts_with(&open) && is_tag_boundary(rest, open.len()) {
                depth += 1;
            }
            cursor = pos + 1;
        }
    }

    None
}

fn is_tag_boundary(rest: &str, at: usize) -> bool {
    matches!(
        rest.as_bytes().get(at),
        Some(b'>') | Some(b' ') | Some(b'\n') | Some(b'\t') | Some(b'\r') | Some(b'/')
    )
}
