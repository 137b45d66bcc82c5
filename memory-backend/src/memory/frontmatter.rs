//! Parse and generate the frontmatter block of memory files.
//!
//! Hand-rolled (no serde_yaml): one `key: value` per line, where a value is a
//! bracketed list, a boolean literal, or a plain string.
//!
//! ```text
//! ---
//! type: facts
//! tags: ["tools", "preference"]
//! created: 2024-03-01
//! ---
//!
//! body...
//! ```

use crate::models::{MetaValue, Metadata};

/// Marker line opening and closing the frontmatter block
pub const DELIMITER: &str = "---";

/// A parsed memory file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMemory {
    pub metadata: Metadata,
    pub body: String,
}

/// Parse a complete memory file (frontmatter + body).
///
/// Content that does not open with the delimiter line, or never closes the
/// block, yields empty metadata and the whole content as body.
pub fn parse_memory(content: &str) -> ParsedMemory {
    match split_frontmatter(content) {
        Some((block, body)) => ParsedMemory {
            metadata: parse_frontmatter(block),
            body: body.to_string(),
        },
        None => ParsedMemory {
            metadata: Metadata::new(),
            body: content.to_string(),
        },
    }
}

/// Split content into (frontmatter block, body). The single blank line that
/// separates the closing delimiter from the body is consumed.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix("---\n")?;

    let (block, after) = if let Some(after) = rest.strip_prefix("---\n") {
        ("", after)
    } else if rest == DELIMITER {
        ("", "")
    } else if let Some(close_idx) = rest.find("\n---\n") {
        (&rest[..close_idx], &rest[close_idx + 5..])
    } else if let Some(block) = rest.strip_suffix("\n---") {
        (block, "")
    } else {
        return None;
    };

    Some((block, after.strip_prefix('\n').unwrap_or(after)))
}

/// Parse the lines between the delimiters
pub fn parse_frontmatter(block: &str) -> Metadata {
    let mut metadata = Metadata::new();

    for line in block.lines() {
        if let Some((key, value)) = line.split_once(':') {
            metadata.insert(key.trim(), parse_value(value.trim()));
        }
    }

    metadata
}

fn parse_value(value: &str) -> MetaValue {
    if value.starts_with('[') && value.ends_with(']') && value.len() >= 2 {
        return MetaValue::List(parse_inline_list(value));
    }

    if value.eq_ignore_ascii_case("true") {
        return MetaValue::Flag(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return MetaValue::Flag(false);
    }

    MetaValue::Text(value.to_string())
}

/// Parse an inline list like `["foo", 'bar', baz]`. `[]` is the empty list.
fn parse_inline_list(s: &str) -> Vec<String> {
    let inner = &s[1..s.len() - 1];
    if inner.trim().is_empty() {
        return Vec::new();
    }

    inner
        .split(',')
        .map(|item| item.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .collect()
}

/// Render metadata as `key: value` lines (no delimiters), in insertion order
pub fn format_frontmatter(metadata: &Metadata) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{}: {}", key, format_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_value(value: &MetaValue) -> String {
    match value {
        MetaValue::List(items) => {
            let quoted: Vec<String> = items.iter().map(|i| format!("\"{}\"", i)).collect();
            format!("[{}]", quoted.join(", "))
        }
        MetaValue::Flag(b) => b.to_string(),
        MetaValue::Text(s) => s.clone(),
    }
}

/// Compose a full memory file: delimited frontmatter, a blank line, then the body
pub fn compose_memory(metadata: &Metadata, body: &str) -> String {
    let fm = format_frontmatter(metadata);
    if fm.is_empty() {
        format!("{}\n{}\n\n{}", DELIMITER, DELIMITER, body)
    } else {
        format!("{}\n{}\n{}\n\n{}", DELIMITER, fm, DELIMITER, body)
    }
}
