//! Placeholder protocol.
//!
//! The only bit-exact contract between extractors and the validator:
//!
//! ```text
//! $$        literal dollar sign
//! $01..$99  placeholder marker, index 1..=99
//! ```
//!
//! Any other use of `$` is a malformed escape and fails at decode time.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_till1, take_while_m_n},
    character::complete::char,
    combinator::{map, map_res, value},
    sequence::preceded,
};
use serde::Serialize;

use crate::error::{SiftError, SiftResult};

/// Highest placeholder index the two-digit encoding can carry.
pub const MAX_PLACEHOLDERS: usize = 99;

/// Hint about what a placeholder most likely stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    /// Table or column name position.
    Identifier,
    /// Value position (numbers, repr-quoted values).
    Literal,
    #[default]
    Unknown,
}

/// An unresolved runtime value inside a candidate string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placeholder {
    pub index: u8,
    pub kind: PlaceholderKind,
    /// Source text of the expression the placeholder replaced, when known.
    pub expression: Option<String>,
}

/// A raw segment of a candidate, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

/// One element of a decoded canonical string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Placeholder(u8),
}

/// Append `text` to `out`, doubling every `$`.
pub fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        if ch == '$' {
            out.push_str("$$");
        } else {
            out.push(ch);
        }
    }
}

/// Escape literal text into canonical form.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

/// Append the `$NN` marker for `index`.
pub fn push_marker(index: usize, out: &mut String) -> SiftResult<()> {
    if !(1..=MAX_PLACEHOLDERS).contains(&index) {
        return Err(SiftError::InvalidPlaceholder(index));
    }
    out.push_str(&format!("${:02}", index));
    Ok(())
}

/// Render segments into the canonical wire form.
pub fn encode(segments: &[Segment]) -> SiftResult<String> {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text(text) => escape_into(text, &mut out),
            Segment::Placeholder(p) => push_marker(p.index as usize, &mut out)?,
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
enum RawPiece<'a> {
    Text(&'a str),
    Dollar,
    Marker(u8),
}

fn text_run(input: &str) -> IResult<&str, RawPiece<'_>> {
    map(take_till1(|c| c == '$'), RawPiece::Text).parse(input)
}

fn literal_dollar(input: &str) -> IResult<&str, RawPiece<'_>> {
    value(RawPiece::Dollar, tag("$$")).parse(input)
}

fn marker(input: &str) -> IResult<&str, RawPiece<'_>> {
    map_res(
        preceded(char('$'), take_while_m_n(2, 2, |c: char| c.is_ascii_digit())),
        |digits: &str| match digits.parse::<u8>() {
            Ok(n) if n >= 1 => Ok(RawPiece::Marker(n)),
            _ => Err("placeholder index out of range"),
        },
    )
    .parse(input)
}

/// Decode a canonical string into alternating text runs and placeholders.
///
/// Adjacent text (including decoded `$$`) is merged into a single run, so the
/// output never contains two consecutive `Piece::Text`.
pub fn decode(canonical: &str) -> SiftResult<Vec<Piece>> {
    let mut pieces: Vec<Piece> = Vec::new();
    let mut rest = canonical;

    while !rest.is_empty() {
        let (remaining, raw) = alt((text_run, literal_dollar, marker))
            .parse(rest)
            .map_err(|_| SiftError::MalformedEscape {
                position: canonical.len() - rest.len(),
                found: rest.chars().take(3).collect(),
            })?;

        match raw {
            RawPiece::Text(text) => push_text(&mut pieces, text),
            RawPiece::Dollar => push_text(&mut pieces, "$"),
            RawPiece::Marker(index) => pieces.push(Piece::Placeholder(index)),
        }
        rest = remaining;
    }

    Ok(pieces)
}

fn push_text(pieces: &mut Vec<Piece>, text: &str) {
    if let Some(Piece::Text(last)) = pieces.last_mut() {
        last.push_str(text);
    } else {
        pieces.push(Piece::Text(text.to_string()));
    }
}

/// Render a canonical string for humans: placeholders as `{$NN}`.
pub fn display_canonical(canonical: &str) -> SiftResult<String> {
    let mut out = String::new();
    for piece in decode(canonical)? {
        match piece {
            Piece::Text(text) => out.push_str(&text),
            Piece::Placeholder(index) => out.push_str(&format!("{{${:02}}}", index)),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ph(index: u8) -> Segment {
        Segment::Placeholder(Placeholder {
            index,
            kind: PlaceholderKind::Unknown,
            expression: None,
        })
    }

    #[test]
    fn test_escape_round_trip() {
        let samples = [
            "",
            "$",
            "$$",
            "price: $5",
            "$01 is not a placeholder here",
            "a$b$$c$$$d",
            "SELECT '$' || name FROM t",
            "trailing $",
        ];
        for text in samples {
            let decoded = decode(&escape(text)).unwrap();
            if text.is_empty() {
                assert!(decoded.is_empty());
            } else {
                assert_eq!(decoded, vec![Piece::Text(text.to_string())], "{text}");
            }
        }
    }

    #[test]
    fn test_encode_interleaving() {
        let segments = vec![
            Segment::Text("SELECT ".into()),
            ph(1),
            Segment::Text(" FROM t WHERE cost > $".into()),
            ph(2),
        ];
        let canonical = encode(&segments).unwrap();
        assert_eq!(canonical, "SELECT $01 FROM t WHERE cost > $$$02");
        assert_eq!(
            decode(&canonical).unwrap(),
            vec![
                Piece::Text("SELECT ".into()),
                Piece::Placeholder(1),
                Piece::Text(" FROM t WHERE cost > $".into()),
                Piece::Placeholder(2),
            ]
        );
    }

    #[test]
    fn test_literal_dollar_before_digits() {
        let pieces = decode("y = $$03").unwrap();
        assert_eq!(pieces, vec![Piece::Text("y = $03".into())]);
    }

    #[test]
    fn test_marker_consumes_exactly_two_digits() {
        let pieces = decode("$123").unwrap();
        assert_eq!(
            pieces,
            vec![Piece::Placeholder(12), Piece::Text("3".into())]
        );
    }

    #[test]
    fn test_malformed_escapes() {
        for bad in ["$", "abc $", "$x", "$00", "$1", "$1a", "ok $$ then $ "] {
            let err = decode(bad).unwrap_err();
            assert!(
                matches!(err, SiftError::MalformedEscape { .. }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn test_malformed_escape_position() {
        match decode("SELECT $x").unwrap_err() {
            SiftError::MalformedEscape { position, found } => {
                assert_eq!(position, 7);
                assert_eq!(found, "$x");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_marker_bounds() {
        let mut out = String::new();
        assert!(push_marker(99, &mut out).is_ok());
        assert_eq!(out, "$99");
        assert!(matches!(
            push_marker(100, &mut out),
            Err(SiftError::InvalidPlaceholder(100))
        ));
        assert!(matches!(
            push_marker(0, &mut out),
            Err(SiftError::InvalidPlaceholder(0))
        ));
    }

    #[test]
    fn test_display_canonical() {
        assert_eq!(
            display_canonical("id = $01 AND cost = $$5").unwrap(),
            "id = {$01} AND cost = $5"
        );
    }
}
