//! Splitting of Python format strings into text and fields.
//!
//! Three template flavours: f-strings, `str.format` brace templates and
//! printf-style `%` templates.

use regex::Regex;
use std::sync::LazyLock;

use super::lexer::decode_escapes;
use crate::placeholder::PlaceholderKind;

/// printf-style conversion specifier, see `printf-style String Formatting`.
static PERCENT_SPEC: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"%(?:\((?P<key>[^)]*)\))?[#0\- +]*(?:\*|\d+)?(?:\.(?:\*|\d+))?[hlL]?(?P<conv>[diouxXeEfFgGcrsa%])",
    )
    .ok()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKey {
    /// `{}` or `%s`: next positional argument.
    Auto,
    Index(usize),
    Name(String),
    /// f-string field; carries its own expression.
    Inline(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: FieldKey,
    pub kind: PlaceholderKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Text(String),
    Field(Field),
}

fn push_text(parts: &mut Vec<TemplatePart>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(TemplatePart::Text(last)) = parts.last_mut() {
        last.push_str(text);
    } else {
        parts.push(TemplatePart::Text(text.to_string()));
    }
}

/// Split a replacement field body `name!conv:spec` at its top level.
fn split_field(body: &str) -> (&str, Option<char>, Option<&str>) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '!' if depth == 0 && chars.peek().map(|(_, n)| *n) != Some('=') => {
                let expr = &body[..i];
                let rest = &body[i + 1..];
                let conversion = rest.chars().next();
                let spec = rest.find(':').map(|j| &rest[j + 1..]);
                return (expr, conversion, spec);
            }
            ':' if depth == 0 => return (&body[..i], None, Some(&body[i + 1..])),
            _ => {}
        }
    }
    (body, None, None)
}

fn kind_for(conversion: Option<char>, spec: Option<&str>) -> PlaceholderKind {
    if matches!(conversion, Some('r' | 'a')) {
        return PlaceholderKind::Literal;
    }
    match spec.and_then(|s| s.chars().last()) {
        Some('d' | 'f' | 'F' | 'e' | 'E' | 'g' | 'G' | 'n' | 'x' | 'X' | 'o' | 'b' | '%') => {
            PlaceholderKind::Literal
        }
        _ => PlaceholderKind::Unknown,
    }
}

/// Walk `{...}` fields with `{{`/`}}` escapes. `on_field` gets the field body.
/// `None` when braces are unbalanced.
fn split_braces(
    text: &str,
    mut on_text: impl FnMut(&mut Vec<TemplatePart>, &str),
    mut on_field: impl FnMut(&mut Vec<TemplatePart>, &str),
) -> Option<Vec<TemplatePart>> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' if bytes.get(i + 1) == Some(&b'{') => {
                on_text(&mut parts, &text[literal_start..i + 1]);
                i += 2;
                literal_start = i;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => {
                on_text(&mut parts, &text[literal_start..i + 1]);
                i += 2;
                literal_start = i;
            }
            b'}' => return None,
            b'{' => {
                on_text(&mut parts, &text[literal_start..i]);
                let body_start = i + 1;
                let mut depth = 1usize;
                let mut quote: Option<u8> = None;
                let mut j = body_start;
                while j < bytes.len() {
                    let b = bytes[j];
                    if let Some(q) = quote {
                        if b == q {
                            quote = None;
                        }
                    } else {
                        match b {
                            b'\'' | b'"' => quote = Some(b),
                            b'{' => depth += 1,
                            b'}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    j += 1;
                }
                if j >= bytes.len() {
                    return None;
                }
                on_field(&mut parts, &text[body_start..j]);
                i = j + 1;
                literal_start = i;
            }
            _ => i += 1,
        }
    }
    on_text(&mut parts, &text[literal_start..]);
    Some(parts)
}

/// Split an f-string body (escapes still encoded).
///
/// Literal stretches are escape-decoded unless `raw`. Self-documenting
/// fields (`{x=}`) keep their `x=` prefix as text.
pub fn split_fstring(body: &str, raw: bool) -> Option<Vec<TemplatePart>> {
    split_braces(
        body,
        |parts, text| {
            if raw {
                push_text(parts, text);
            } else {
                push_text(parts, &decode_escapes(text));
            }
        },
        |parts, field| {
            let (expr, conversion, spec) = split_field(field);
            let trimmed = expr.trim();
            let expression = match trimmed.strip_suffix('=') {
                Some(inner) if !inner.ends_with(['=', '!', '<', '>']) => {
                    push_text(parts, expr);
                    inner.trim()
                }
                _ => trimmed,
            };
            parts.push(TemplatePart::Field(Field {
                key: FieldKey::Inline(expression.to_string()),
                kind: kind_for(conversion, spec),
            }));
        },
    )
}

/// Split a `str.format` template (already escape-decoded).
pub fn split_brace_template(text: &str) -> Option<Vec<TemplatePart>> {
    split_braces(text, push_text, |parts, field| {
        let (name, conversion, spec) = split_field(field);
        let head = name
            .split(['.', '['])
            .next()
            .unwrap_or_default()
            .trim();
        let key = if head.is_empty() {
            FieldKey::Auto
        } else if let Ok(index) = head.parse::<usize>() {
            FieldKey::Index(index)
        } else {
            FieldKey::Name(head.to_string())
        };
        parts.push(TemplatePart::Field(Field {
            key,
            kind: kind_for(conversion, spec),
        }));
    })
}

/// Split a printf-style template. `%%` becomes a literal `%`; a lone `%`
/// that is not a conversion stays text.
pub fn split_percent_template(text: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut last = 0;
    let Some(spec) = PERCENT_SPEC.as_ref() else {
        push_text(&mut parts, text);
        return parts;
    };

    for caps in spec.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text(&mut parts, &text[last..whole.start()]);
        last = whole.end();

        let conv = caps.name("conv").map(|m| m.as_str()).unwrap_or("s");
        if conv == "%" {
            push_text(&mut parts, "%");
            continue;
        }
        let key = match caps.name("key") {
            Some(key) => FieldKey::Name(key.as_str().to_string()),
            None => FieldKey::Auto,
        };
        let kind = match conv {
            "s" | "c" => PlaceholderKind::Unknown,
            _ => PlaceholderKind::Literal,
        };
        parts.push(TemplatePart::Field(Field { key, kind }));
    }
    push_text(&mut parts, &text[last..]);
    parts
}

/// Whether the parts contain at least one field.
pub fn has_fields(parts: &[TemplatePart]) -> bool {
    parts.iter().any(|p| matches!(p, TemplatePart::Field(_)))
}
