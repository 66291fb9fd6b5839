//! `format!`-style template parsing.

use crate::placeholder::PlaceholderKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgRef {
    /// `{}`: the next positional argument.
    Next,
    /// `{0}`
    Index(usize),
    /// `{name}`: a named argument or an inline capture.
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatPart {
    Text(String),
    Field {
        arg: ArgRef,
        kind: PlaceholderKind,
        /// `.*` precision consumes one extra positional argument first.
        star_precision: bool,
    },
}

/// Split a format string into text and fields.
///
/// Returns `None` for malformed templates (stray `}` or unclosed `{`),
/// which rustc would reject anyway.
pub fn split_format_string(template: &str) -> Option<Vec<FormatPart>> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '}' => return None,
            '{' => {
                let mut body = String::new();
                loop {
                    match chars.next()? {
                        '}' => break,
                        c => body.push(c),
                    }
                }
                if !text.is_empty() {
                    parts.push(FormatPart::Text(std::mem::take(&mut text)));
                }
                parts.push(parse_field(&body));
            }
            c => text.push(c),
        }
    }
    if !text.is_empty() {
        parts.push(FormatPart::Text(text));
    }
    Some(parts)
}

fn parse_field(body: &str) -> FormatPart {
    let (name, spec) = match body.split_once(':') {
        Some((name, spec)) => (name.trim(), spec),
        None => (body.trim(), ""),
    };
    let arg = if name.is_empty() {
        ArgRef::Next
    } else if let Ok(index) = name.parse::<usize>() {
        ArgRef::Index(index)
    } else {
        ArgRef::Named(name.to_string())
    };
    let kind = match spec.chars().last() {
        Some('?' | 'x' | 'X' | 'o' | 'b' | 'e' | 'E') => PlaceholderKind::Literal,
        _ => PlaceholderKind::Unknown,
    };
    FormatPart::Field {
        arg,
        kind,
        star_precision: spec.contains(".*"),
    }
}
