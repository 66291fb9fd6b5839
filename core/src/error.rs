//! Error types for sqlsift.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SiftError {
    /// A `$` in a canonical string that is neither `$$` nor `$01`..`$99`.
    #[error("Malformed placeholder escape at position {position}: '{found}'")]
    MalformedEscape { position: usize, found: String },

    /// Attempt to encode a placeholder index outside 1..=99.
    #[error("Invalid placeholder index {0}: expected 1..=99")]
    InvalidPlaceholder(usize),

    /// The host-language source could not be parsed.
    #[error("Source parse error at {line}:{column}: {message}")]
    SourceParse {
        line: usize,
        column: usize,
        message: String,
    },

    /// An extractor tried to allocate a 100th placeholder in one candidate.
    #[error("Placeholder overflow at {line}:{column}: more than 99 placeholders in one candidate")]
    PlaceholderOverflow { line: usize, column: usize },

    #[error("Grammar construction error: {0}")]
    Grammar(String),
}

impl SiftError {
    /// Create a source parse error at the given position.
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::SourceParse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a grammar construction error.
    pub fn grammar(message: impl Into<String>) -> Self {
        Self::Grammar(message.into())
    }

    /// Whether the batch can simply skip the offending unit and move on.
    ///
    /// Parse failures are expected on real code bases. Everything else is a
    /// broken contract between components.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::SourceParse { .. })
    }
}

/// Result type alias for sqlsift operations.
pub type SiftResult<T> = Result<T, SiftError>;
