//! Scan orchestration on the tokio runtime.
//!
//! A blocking producer feeds source files through a bounded channel. Files
//! are analyzed in `spawn_blocking` tasks, at most `jobs` at a time.
//! Results are gathered, sorted by location and handed back in one piece.

use anyhow::{Context, Result};
use sqlsift_core::extractor::{ExtractOptions, SourceFile, extractor_for};
use sqlsift_core::pipeline::{AnalysisRecord, CancelToken, FileFailure, FileReport, analyze_file};
use sqlsift_core::validator::{Validator, ValidatorConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::discovery::{SourcePath, discover};
use crate::dump::{DumpReader, DumpSummary};

/// How often a running scan reports progress.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(20);

/// Where the files to scan come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanInput {
    /// Files and directories on disk.
    Paths(Vec<PathBuf>),
    /// A gzip JSON-lines corpus dump.
    Dump(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub input: ScanInput,
    /// Directory names skipped during discovery. Unused for dumps.
    pub exclude_dirs: Vec<String>,
    pub jobs: usize,
    pub include_rejected: bool,
    pub validator: ValidatorConfig,
    pub extract: ExtractOptions,
}

#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Sorted by (repo, file, line, column).
    pub records: Vec<AnalysisRecord>,
    /// Files handed to an extractor.
    pub files: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub parse_failures: usize,
    pub extraction_failures: usize,
    pub protocol_failures: usize,
    pub io_failures: usize,
    /// Dump lines that were not a valid entry.
    pub malformed_entries: usize,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ScanOutcome {
    fn absorb(&mut self, report: FileReport, include_rejected: bool) {
        self.candidates += report.records.len();
        self.protocol_failures += report.protocol_failures;
        self.cancelled |= report.cancelled;
        match report.failure {
            Some(FileFailure::Parse(_)) => self.parse_failures += 1,
            Some(FileFailure::Extraction(_)) => self.extraction_failures += 1,
            None => {}
        }
        for record in report.records {
            let accepted = record.verdict.accepted();
            if accepted {
                self.accepted += 1;
            }
            if accepted || include_rejected {
                self.records.push(record);
            }
        }
    }
}

pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// One unit of work on the channel.
enum Work {
    Disk(SourcePath),
    Inline(SourceFile),
}

impl Work {
    fn path(&self) -> PathBuf {
        match self {
            Self::Disk(source) => source.path.clone(),
            Self::Inline(file) => file.path.clone(),
        }
    }
}

/// Analyze one file. Files from disk with invalid UTF-8 are replaced, not
/// rejected.
fn analyze(
    work: Work,
    extract: &ExtractOptions,
    validator: &Validator,
    cancel: &CancelToken,
) -> std::io::Result<FileReport> {
    let file = match work {
        Work::Disk(source) => {
            let bytes = std::fs::read(&source.path)?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            SourceFile::new(source.path, source.language, text)
        }
        Work::Inline(file) => file,
    };
    let extractor = extractor_for(file.language, extract.clone());
    Ok(analyze_file(&file, extractor.as_ref(), validator, cancel))
}

/// Start the producer for `input`. Setup errors (missing root, unreadable
/// dump) surface here; the producer stops once the receiver is gone.
fn feed(
    input: &ScanInput,
    exclude_dirs: &[String],
    tx: mpsc::Sender<Work>,
) -> Result<JoinHandle<Option<DumpSummary>>> {
    match input {
        ScanInput::Paths(paths) => {
            let files = discover(paths, exclude_dirs)?;
            tracing::info!(files = files.len(), "discovered");
            Ok(tokio::task::spawn_blocking(move || {
                for source in files {
                    if tx.blocking_send(Work::Disk(source)).is_err() {
                        break;
                    }
                }
                None
            }))
        }
        ScanInput::Dump(path) => {
            let mut reader = DumpReader::open(path)?;
            tracing::info!(dump = %path.display(), "reading dump");
            Ok(tokio::task::spawn_blocking(move || {
                for file in reader.by_ref() {
                    if tx.blocking_send(Work::Inline(file)).is_err() {
                        break;
                    }
                }
                Some(reader.summary())
            }))
        }
    }
}

/// Analyze every file `options.input` yields.
pub async fn scan(options: ScanOptions, cancel: CancelToken) -> Result<ScanOutcome> {
    let started = Instant::now();
    let validator = Arc::new(Validator::new(options.validator.clone()).context("grammar setup failed")?);
    let extract = Arc::new(options.extract.clone());
    let jobs = options.jobs.max(1);

    let (tx, mut rx) = mpsc::channel(jobs * 2);
    let producer = feed(&options.input, &options.exclude_dirs, tx)?;
    tracing::info!(jobs, "scan started");

    let mut set = JoinSet::new();
    let mut outcome = ScanOutcome::default();
    let mut input_open = true;
    let mut done = 0usize;
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;

    while input_open || !set.is_empty() {
        tokio::select! {
            work = rx.recv(), if input_open && set.len() < jobs => {
                match work {
                    Some(_) if cancel.is_cancelled() => {
                        outcome.cancelled = true;
                        input_open = false;
                        rx.close();
                    }
                    Some(work) => {
                        outcome.files += 1;
                        let validator = Arc::clone(&validator);
                        let extract = Arc::clone(&extract);
                        let cancel = cancel.clone();
                        set.spawn(async move {
                            let path = work.path();
                            let result = tokio::task::spawn_blocking(move || {
                                analyze(work, &extract, &validator, &cancel)
                            })
                            .await;
                            (path, result)
                        });
                    }
                    None => input_open = false,
                }
            }
            Some(joined) = set.join_next(), if !set.is_empty() => {
                done += 1;
                match joined {
                    Ok((_, Ok(Ok(report)))) => {
                        outcome.absorb(report, options.include_rejected);
                    }
                    Ok((path, Ok(Err(err)))) => {
                        tracing::warn!(path = %path.display(), "cannot read file: {err}");
                        outcome.io_failures += 1;
                    }
                    Ok((path, Err(err))) => {
                        tracing::error!(path = %path.display(), "analysis task failed: {err}");
                        outcome.extraction_failures += 1;
                    }
                    Err(err) => tracing::error!("scan task failed: {err}"),
                }
            }
            _ = ticker.tick() => {
                tracing::info!(done, dispatched = outcome.files, candidates = outcome.candidates, "progress");
            }
        }
    }

    drop(rx);
    match producer.await {
        Ok(Some(summary)) => {
            outcome.malformed_entries += summary.malformed;
            if summary.truncated {
                outcome.io_failures += 1;
            }
        }
        Ok(None) => {}
        Err(err) => tracing::error!("input task failed: {err}"),
    }

    outcome.cancelled |= cancel.is_cancelled();
    outcome
        .records
        .sort_by(|a, b| (&a.repo, &a.location).cmp(&(&b.repo, &b.location)));
    outcome.elapsed = started.elapsed();
    tracing::info!(
        files = outcome.files,
        candidates = outcome.candidates,
        accepted = outcome.accepted,
        cancelled = outcome.cancelled,
        "scan finished"
    );
    Ok(outcome)
}

/// Cancel on Ctrl-C, SIGTERM or when `timeout` elapses.
pub fn spawn_cancel_watcher(cancel: CancelToken, timeout: Option<Duration>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    tracing::warn!("cannot listen for SIGTERM: {err}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        let deadline = async {
            match timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ctrl_c => tracing::warn!("interrupted, finishing current candidates"),
            _ = terminate => tracing::warn!("terminated, finishing current candidates"),
            _ = deadline => tracing::warn!("run timeout reached"),
        }
        cancel.cancel();
    })
}
