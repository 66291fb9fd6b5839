//! Result serialization: CSV and JSON lines.

use clap::ValueEnum;
use sqlsift_core::pipeline::AnalysisRecord;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Jsonl,
}

/// The `repo` column is empty for files scanned from disk.
pub const CSV_HEADER: &str = "repo,file,line,column,language,query,accepted,statement_kind";

/// Quote a field per RFC 4180 when it contains a separator, quote or newline.
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn csv_row(record: &AnalysisRecord) -> String {
    let kind = record
        .verdict
        .statement_kind()
        .map(|k| k.as_str())
        .unwrap_or("");
    [
        csv_escape(record.repo.as_deref().unwrap_or("")),
        csv_escape(&record.location.file.display().to_string()),
        record.location.line.to_string(),
        record.location.column.to_string(),
        record.language.as_str().to_string(),
        csv_escape(&record.display),
        record.verdict.accepted().to_string(),
        kind.to_string(),
    ]
    .join(",")
}

/// Write every record in `format`, header first for CSV.
pub fn write_records<W: Write>(
    mut out: W,
    records: &[AnalysisRecord],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Csv => {
            writeln!(out, "{CSV_HEADER}")?;
            for record in records {
                writeln!(out, "{}", csv_row(record))?;
            }
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut out, record)?;
                writeln!(out)?;
            }
        }
    }
    out.flush()
}
