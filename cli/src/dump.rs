//! Corpus dumps: gzip-compressed JSON lines, one source file per line.
//!
//! ```json
//! {"repo_name": "acme/shop", "path": "app/db.py", "content": "..."}
//! ```
//!
//! Lines whose path has no extractor or that carry no content are passed
//! over silently. Lines that are not valid JSON are logged and counted.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::Deserialize;
use sqlsift_core::extractor::{Language, SourceFile};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct DumpEntry {
    repo_name: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
}

/// What reading a dump produced besides the files themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub lines: usize,
    /// Lines with an extractor and content.
    pub files: usize,
    /// Lines that were not a valid entry.
    pub malformed: usize,
    /// The stream ended in a read or decompression error.
    pub truncated: bool,
}

/// Line-by-line reader over a dump.
pub struct DumpReader<R> {
    lines: std::io::Lines<BufReader<R>>,
    summary: DumpSummary,
}

impl DumpReader<GzDecoder<File>> {
    /// Open a `.jsonl.gz` dump.
    pub fn open(path: &Path) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("cannot open dump '{}'", path.display()))?;
        Ok(Self::new(GzDecoder::new(file)))
    }
}

impl<R: Read> DumpReader<R> {
    /// Read uncompressed JSON lines from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
            summary: DumpSummary::default(),
        }
    }

    pub fn summary(&self) -> DumpSummary {
        self.summary
    }

    fn entry(&mut self, line: &str) -> Option<SourceFile> {
        let entry: DumpEntry = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(line = self.summary.lines, "malformed dump entry: {err}");
                self.summary.malformed += 1;
                return None;
            }
        };
        let language = Language::from_path(Path::new(&entry.path))?;
        let content = entry.content?;
        self.summary.files += 1;
        Some(SourceFile::new(entry.path, language, content).with_repo(entry.repo_name))
    }
}

impl<R: Read> Iterator for DumpReader<R> {
    type Item = SourceFile;

    fn next(&mut self) -> Option<SourceFile> {
        if self.summary.truncated {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => {
                    tracing::error!(line = self.summary.lines + 1, "dump unreadable: {err}");
                    self.summary.truncated = true;
                    return None;
                }
            };
            self.summary.lines += 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(file) = self.entry(&line) {
                return Some(file);
            }
        }
    }
}
