//! sqlsift: find embedded SQL in Python and Rust code.
//!
//! ```bash
//! sqlsift scan src/ -o queries.csv
//! sqlsift scan --dump corpus-000.jsonl.gz -o queries.csv
//! sqlsift scan app.py --sink execute --include-rejected --format jsonl
//! sqlsift extract app/models.py
//! sqlsift check 'SELECT * FROM users WHERE id = $01'
//! ```

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use sqlsift::config::SiftConfig;
use sqlsift::output::{OutputFormat, write_records};
use sqlsift::run::{
    ScanInput, ScanOptions, ScanOutcome, default_jobs, scan, spawn_cancel_watcher,
};
use sqlsift_core::placeholder::display_canonical;
use sqlsift_core::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlsift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find SQL statements embedded in source code", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (default: ./sqlsift.toml, then the user config dir)
    #[arg(long, global = true, env = "SQLSIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan files and directories, writing every SQL statement found
    Scan {
        /// Files or directories to scan
        #[arg(required_unless_present = "dump", conflicts_with = "dump")]
        paths: Vec<PathBuf>,

        /// Read sources from a gzip JSON-lines dump (repo_name, path, content)
        #[arg(long, value_name = "FILE")]
        dump: Option<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,

        /// Parallel workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Also write candidates that are not valid SQL
        #[arg(long)]
        include_rejected: bool,

        /// Only consider strings passed to calls with this name (repeatable)
        #[arg(long = "sink")]
        sinks: Vec<String>,

        /// How `;`-separated statement lists are judged: all, any, single
        #[arg(long)]
        policy: Option<StatementPolicy>,

        /// Earley items per candidate before giving up
        #[arg(long)]
        max_items: Option<usize>,

        /// Wall-clock budget per candidate in milliseconds
        #[arg(long)]
        time_budget_ms: Option<u64>,

        /// Also accept FROM-less SELECT, TABLE and top-level VALUES
        #[arg(long)]
        bare_queries: bool,

        /// Abort the whole run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Overwrite an existing output file
        #[arg(short, long)]
        force: bool,
    },
    /// Print the candidates extracted from one file
    Extract {
        file: PathBuf,

        #[arg(long = "sink")]
        sinks: Vec<String>,
    },
    /// Validate one canonical string ($NN placeholders, $$ for a dollar)
    Check {
        canonical: String,

        #[arg(long)]
        policy: Option<StatementPolicy>,

        #[arg(long)]
        bare_queries: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let (mut config, source) = SiftConfig::load(cli.config.as_deref())?;
    if let Some(path) = &source {
        tracing::info!(path = %path.display(), "using config");
    }

    match cli.command {
        Commands::Scan {
            paths,
            dump,
            output,
            format,
            jobs,
            include_rejected,
            sinks,
            policy,
            max_items,
            time_budget_ms,
            bare_queries,
            timeout,
            force,
        } => {
            if let Some(path) = &output
                && path.exists()
                && !force
            {
                bail!(
                    "output file '{}' already exists (use --force to overwrite)",
                    path.display()
                );
            }

            if !sinks.is_empty() {
                config.extractor.sinks = sinks;
            }
            if let Some(policy) = policy {
                config.validator.statement_policy = policy;
            }
            if let Some(max_items) = max_items {
                config.validator.max_items = max_items;
            }
            if time_budget_ms.is_some() {
                config.validator.time_budget_ms = time_budget_ms;
            }
            config.validator.bare_queries |= bare_queries;

            let input = match dump {
                Some(dump) => ScanInput::Dump(dump),
                None => ScanInput::Paths(paths),
            };
            let options = ScanOptions {
                input,
                exclude_dirs: config.scan.exclude_dirs,
                jobs: jobs.or(config.scan.jobs).unwrap_or_else(default_jobs),
                include_rejected: include_rejected || config.scan.include_rejected,
                validator: config.validator,
                extract: config.extractor,
            };
            let timeout = timeout.or(config.scan.timeout_secs).map(Duration::from_secs);

            let cancel = CancelToken::new();
            let watcher = spawn_cancel_watcher(cancel.clone(), timeout);
            let outcome = scan(options, cancel).await;
            watcher.abort();
            let outcome = outcome?;

            write_output(output.as_deref(), &outcome, format)?;
            print_summary(&outcome);

            Ok(if outcome.cancelled {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Extract { file, sinks } => {
            if !sinks.is_empty() {
                config.extractor.sinks = sinks;
            }
            extract_file(&file, config.extractor)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            canonical,
            policy,
            bare_queries,
        } => {
            if let Some(policy) = policy {
                config.validator.statement_policy = policy;
            }
            config.validator.bare_queries |= bare_queries;
            check_canonical(&canonical, config.validator)
        }
    }
}

fn write_output(path: Option<&Path>, outcome: &ScanOutcome, format: OutputFormat) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create '{}'", path.display()))?;
            write_records(BufWriter::new(file), &outcome.records, format)
                .with_context(|| format!("failed writing '{}'", path.display()))?;
        }
        None => {
            write_records(io::stdout().lock(), &outcome.records, format)
                .context("failed writing to stdout")?;
        }
    }
    Ok(())
}

fn print_summary(outcome: &ScanOutcome) {
    eprintln!(
        "{} {} files, {} candidates, {} SQL statements in {:.1}s",
        "sqlsift:".cyan().bold(),
        outcome.files,
        outcome.candidates,
        outcome.accepted.to_string().green().bold(),
        outcome.elapsed.as_secs_f64()
    );
    let skipped = outcome.parse_failures + outcome.io_failures;
    if skipped > 0 {
        eprintln!("  {} {} file(s) skipped", "⚠".yellow(), skipped);
    }
    if outcome.malformed_entries > 0 {
        eprintln!(
            "  {} {} malformed dump line(s)",
            "⚠".yellow(),
            outcome.malformed_entries
        );
    }
    if outcome.extraction_failures + outcome.protocol_failures > 0 {
        eprintln!(
            "  {} {} extraction failure(s), {} protocol failure(s)",
            "✗".red(),
            outcome.extraction_failures,
            outcome.protocol_failures
        );
    }
    if outcome.cancelled {
        eprintln!("  {} run interrupted, results are partial", "⚠".yellow());
    }
}

fn extract_file(path: &Path, options: ExtractOptions) -> Result<()> {
    let Some(language) = Language::from_path(path) else {
        bail!("unsupported file type: {}", path.display());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let file = SourceFile::new(path, language, text);
    let candidates = extractor_for(language, options).extract(&file)?;

    for candidate in &candidates {
        let loc = candidate.location();
        println!(
            "{}:{} {} {}",
            loc.line.to_string().yellow(),
            loc.column.to_string().yellow(),
            candidate.origin().to_string().dimmed(),
            candidate.canonical()
        );
        println!("    {}", candidate.display().cyan());
    }
    eprintln!("{} {} candidate(s)", "✓".green(), candidates.len());
    Ok(())
}

fn check_canonical(canonical: &str, config: ValidatorConfig) -> Result<ExitCode> {
    let validator = Validator::new(config)?;
    let verdict = validator.validate(canonical)?;
    println!("{}", display_canonical(canonical)?);

    match &verdict {
        Verdict::Accepted { kind } => {
            println!("{} {}", "✓ accepted".green().bold(), kind.as_str().cyan());
            Ok(ExitCode::SUCCESS)
        }
        Verdict::Rejected { reason, detail } => {
            println!("{} {}: {}", "✗ rejected".red().bold(), reason, detail);
            Ok(ExitCode::from(1))
        }
    }
}
