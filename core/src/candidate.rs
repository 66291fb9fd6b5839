//! Candidate strings emitted by extractors.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::error::{SiftError, SiftResult};
use crate::placeholder::{self, MAX_PLACEHOLDERS, Placeholder, PlaceholderKind, Segment};

/// Where a candidate was found. Lines and columns are 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl SourceLocation {
    pub fn new(
        file: impl Into<PathBuf>,
        (line, column): (usize, usize),
        (end_line, end_column): (usize, usize),
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line,
            end_column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.column)
    }
}

/// How the candidate's value is produced in the host program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginKind {
    Literal,
    Concatenation,
    FormattedTemplate,
    /// A template whose fields could not be matched to its arguments.
    UnknownDynamic,
}

impl OriginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Concatenation => "concatenation",
            Self::FormattedTemplate => "formatted-template",
            Self::UnknownDynamic => "unknown-dynamic",
        }
    }

    /// The less static of two origins.
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A string extracted from source code, proposed as potential SQL.
///
/// Immutable once built; the canonical form is computed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateString {
    canonical: String,
    segments: Vec<Segment>,
    location: SourceLocation,
    origin: OriginKind,
}

impl CandidateString {
    /// The `$NN`/`$$` encoded form handed to the validator.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn origin(&self) -> OriginKind {
        self.origin
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder(_)))
            .count()
    }

    /// Human-readable form: placeholders rendered as `{expression}`.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => {
                    out.push('{');
                    out.push_str(p.expression.as_deref().unwrap_or("?"));
                    out.push('}');
                }
            }
        }
        out
    }
}

/// Incrementally assembles one candidate, assigning placeholder indices
/// left to right starting at 1.
#[derive(Debug)]
pub struct CandidateBuilder {
    segments: Vec<Segment>,
    placeholders: usize,
    origin: OriginKind,
    line: usize,
    column: usize,
}

impl CandidateBuilder {
    /// `line`/`column` locate the expression for error reporting.
    pub fn new(origin: OriginKind, line: usize, column: usize) -> Self {
        Self {
            segments: Vec::new(),
            placeholders: 0,
            origin,
            line,
            column,
        }
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_string()));
        }
        self
    }

    /// Append a fresh placeholder.
    ///
    /// An `Unknown` kind is refined from the preceding text when it ends in a
    /// table-position keyword or a comparison operator.
    pub fn placeholder(
        &mut self,
        kind: PlaceholderKind,
        expression: Option<String>,
    ) -> SiftResult<&mut Self> {
        if self.placeholders >= MAX_PLACEHOLDERS {
            return Err(SiftError::PlaceholderOverflow {
                line: self.line,
                column: self.column,
            });
        }
        self.placeholders += 1;

        let kind = match kind {
            PlaceholderKind::Unknown => self.kind_from_context(),
            known => known,
        };
        self.segments.push(Segment::Placeholder(Placeholder {
            index: self.placeholders as u8,
            kind,
            expression,
        }));
        Ok(self)
    }

    pub fn origin(&mut self, origin: OriginKind) -> &mut Self {
        self.origin = self.origin.merge(origin);
        self
    }

    pub fn finish(self, location: SourceLocation) -> SiftResult<CandidateString> {
        let canonical = placeholder::encode(&self.segments)?;
        Ok(CandidateString {
            canonical,
            segments: self.segments,
            location,
            origin: self.origin,
        })
    }

    fn kind_from_context(&self) -> PlaceholderKind {
        let Some(Segment::Text(text)) = self.segments.last() else {
            return PlaceholderKind::Unknown;
        };
        let trimmed = text.trim_end();
        if trimmed.ends_with(['=', '<', '>']) {
            return PlaceholderKind::Literal;
        }
        let last_word = trimmed
            .rsplit(|c: char| c.is_whitespace())
            .next()
            .unwrap_or("")
            .to_ascii_uppercase();
        match last_word.as_str() {
            "FROM" | "JOIN" | "INTO" | "UPDATE" | "TABLE" => PlaceholderKind::Identifier,
            "LIKE" => PlaceholderKind::Literal,
            _ => PlaceholderKind::Unknown,
        }
    }
}
