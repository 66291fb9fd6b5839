//! Per-file analysis: extract, decode, validate.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::candidate::{CandidateString, OriginKind, SourceLocation};
use crate::error::SiftError;
use crate::extractor::{Extractor, Language, SourceFile};
use crate::validator::{Validator, Verdict};

/// Shared abort flag, checked between candidates.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One validated candidate. Query text is stored without surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    pub location: SourceLocation,
    pub language: Language,
    pub canonical: String,
    pub display: String,
    pub origin: OriginKind,
    pub verdict: Verdict,
}

impl AnalysisRecord {
    fn new(candidate: &CandidateString, file: &SourceFile, verdict: Verdict) -> Self {
        Self {
            repo: file.repo.clone(),
            location: candidate.location().clone(),
            language: file.language,
            canonical: candidate.canonical().trim().to_string(),
            display: candidate.display().trim().to_string(),
            origin: candidate.origin(),
            verdict,
        }
    }
}

/// Why a file produced no candidates at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum FileFailure {
    /// The source could not be parsed; the file was skipped.
    Parse(String),
    /// The extractor broke its contract (placeholder overflow, bad encoding).
    Extraction(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub language: Language,
    pub records: Vec<AnalysisRecord>,
    pub failure: Option<FileFailure>,
    /// Candidates whose canonical form did not decode.
    pub protocol_failures: usize,
    pub cancelled: bool,
}

impl FileReport {
    fn empty(file: &SourceFile) -> Self {
        Self {
            path: file.path.clone(),
            language: file.language,
            records: Vec::new(),
            failure: None,
            protocol_failures: 0,
            cancelled: false,
        }
    }

    pub fn accepted(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter().filter(|r| r.verdict.accepted())
    }
}

/// Run one file through extraction and validation.
///
/// Never fails: parse failures, contract violations and protocol failures are
/// recorded in the report and logged.
pub fn analyze_file(
    file: &SourceFile,
    extractor: &dyn Extractor,
    validator: &Validator,
    cancel: &CancelToken,
) -> FileReport {
    let mut report = FileReport::empty(file);
    if cancel.is_cancelled() {
        report.cancelled = true;
        return report;
    }

    let candidates = match extractor.extract(file) {
        Ok(candidates) => candidates,
        Err(err) if err.is_recoverable() => {
            tracing::warn!(file = %file.path.display(), "skipping file: {err}");
            report.failure = Some(FileFailure::Parse(err.to_string()));
            return report;
        }
        Err(err) => {
            tracing::error!(file = %file.path.display(), "extraction failed: {err}");
            report.failure = Some(FileFailure::Extraction(err.to_string()));
            return report;
        }
    };

    tracing::debug!(
        file = %file.path.display(),
        candidates = candidates.len(),
        "extracted"
    );

    for candidate in &candidates {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match validator.validate(candidate.canonical()) {
            Ok(verdict) => {
                report
                    .records
                    .push(AnalysisRecord::new(candidate, file, verdict));
            }
            Err(err @ SiftError::MalformedEscape { .. }) => {
                tracing::warn!(location = %candidate.location(), "protocol violation: {err}");
                report.protocol_failures += 1;
            }
            Err(err) => {
                tracing::error!(location = %candidate.location(), "validation failed: {err}");
                report.protocol_failures += 1;
            }
        }
    }

    report
}
