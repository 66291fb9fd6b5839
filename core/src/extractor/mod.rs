//! Per-language candidate extraction.
//!
//! Every supported host language is one [`Extractor`] implementation:
//! - Python: hand-written lexer and tolerant expression parser
//! - Rust: full AST walk with `syn`
//!
//! Extractors only look at one expression tree at a time. They never follow
//! values through assignments, calls or returns.

pub mod python;
pub mod rust_ast;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::candidate::CandidateString;
use crate::error::SiftResult;

pub use python::PythonExtractor;
pub use rust_ast::RustExtractor;

/// Host languages with an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
}

impl Language {
    /// Detect the language from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "py" | "pyw" => Some(Self::Python),
            "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Rust => "rust",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source file handed over by the controller.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    pub text: String,
    /// Repository the file came from, when read from a corpus dump.
    pub repo: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: Language, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            text: text.into(),
            repo: None,
        }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }
}

/// Extraction knobs shared by all languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Call names whose arguments count as SQL sinks (`execute`, `query`).
    /// Empty means every string expression is a candidate.
    pub sinks: Vec<String>,
}

impl ExtractOptions {
    pub fn with_sinks<I, S>(sinks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sinks: sinks.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a call named `name` is a sink. Matches the last path segment.
    pub fn is_sink(&self, name: &str) -> bool {
        let last = name.rsplit(['.', ':']).next().unwrap_or(name);
        self.sinks.iter().any(|s| s == last)
    }

    pub fn filters_sinks(&self) -> bool {
        !self.sinks.is_empty()
    }
}

/// Produce candidate strings from one parsed source file.
///
/// Calling `extract` again on the same file yields the same candidates in the
/// same order.
pub trait Extractor: Send + Sync {
    fn language(&self) -> Language;

    /// Candidates in source order.
    ///
    /// The sequence is collected eagerly: the whole file is parsed before
    /// the first candidate exists, and a placeholder overflow anywhere must
    /// fail the file before any of its candidates reach the validator.
    ///
    /// `SiftError::SourceParse` means the file could not be parsed and should
    /// be skipped. `SiftError::PlaceholderOverflow` is a contract violation.
    fn extract(&self, file: &SourceFile) -> SiftResult<Vec<CandidateString>>;
}

/// The extractor for `language`, configured with `options`.
pub fn extractor_for(language: Language, options: ExtractOptions) -> Box<dyn Extractor> {
    match language {
        Language::Python => Box::new(PythonExtractor::new(options)),
        Language::Rust => Box::new(RustExtractor::new(options)),
    }
}
