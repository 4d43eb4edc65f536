//! CLI for benchmark history.
//!
//! This crate provides the `bench-history` command: validating and ingesting
//! CI benchmark entries, querying the history and checking candidate entries
//! for regressions. Query results are written to stdout as JSON; logs go to
//! stderr.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::Context;
use bench_history_analysis::{markdown, RegressionEngine};
use bench_history_core::{logging, validate_entry, BenchmarkEntry, Settings, ValidationErrors};
use bench_history_storage::{FileBackedStore, JsonFileBackend, StoreError};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::json;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Exit code for payloads that failed validation.
pub const EXIT_VALIDATION: i32 = 2;

/// Exit code for persistence failures; retrying may succeed.
pub const EXIT_STORAGE: i32 = 3;

/// Benchmark history CLI.
#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to `bench-history.*` in the working directory).
    #[arg(short, long, global = true, env = "BENCH_HISTORY_CONFIG")]
    pub config: Option<PathBuf>,

    /// History file override (`.js` for the data.js wrapper, otherwise JSON).
    #[arg(short, long, global = true)]
    pub store: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a candidate entry without storing it.
    Validate {
        /// Entry JSON file, or `-` for stdin.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Validate an entry and append it to a suite.
    Ingest {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Entry JSON file, or `-` for stdin.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List entries recorded within an inclusive date range (epoch ms).
    Range {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Lower bound.
        #[arg(long, default_value_t = 0)]
        from: u64,

        /// Upper bound.
        #[arg(long, default_value_t = u64::MAX)]
        to: u64,
    },

    /// List entries recorded for a commit.
    Commit {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Commit id.
        #[arg(long)]
        id: String,
    },

    /// List the most recent entries of a suite.
    Latest {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Number of entries.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Window statistics for one measurement.
    Stats {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Measurement name.
        #[arg(long)]
        bench: String,

        /// Window size (defaults to `regression.window_size`).
        #[arg(short, long)]
        window: Option<usize>,
    },

    /// Check a candidate entry for regressions without storing it.
    Check {
        /// Suite name.
        #[arg(long)]
        suite: String,

        /// Entry JSON file, or `-` for stdin.
        #[arg(short, long)]
        file: PathBuf,

        /// Window size (defaults to `regression.window_size`).
        #[arg(short, long)]
        window: Option<usize>,

        /// Threshold in standard deviations (defaults to `regression.threshold_stddevs`).
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Print a markdown report instead of JSON.
        #[arg(long)]
        markdown: bool,

        /// Exit with an error when any regression is found.
        #[arg(long)]
        fail_on_regression: bool,
    },

    /// List suites and their entry counts.
    Suites,

    /// Show store status and configuration.
    Status {
        /// Show detailed status information.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Run the CLI with the process arguments.
///
/// # Returns
///
/// Returns `Ok(())` on success, or an error if the command fails; see
/// [`exit_code`] for how errors map to process exit codes.
pub fn run() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    logging::init(&settings.log);
    debug!(store = %settings.store.path.display(), "Settings loaded");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &settings, &mut out)
}

/// Load settings and apply command-line overrides.
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    if let Some(store) = &cli.store {
        settings.store.path = store.clone();
    }
    Ok(settings)
}

/// Map an error to the process exit code, so operators can tell a bad
/// payload from a storage problem.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ValidationErrors>().is_some() {
        return EXIT_VALIDATION;
    }
    match err.downcast_ref::<StoreError>() {
        Some(store_err) if store_err.is_storage() => EXIT_STORAGE,
        _ => 1,
    }
}

/// Execute one command against the configured store.
pub fn execute(command: Commands, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Commands::Validate { file } => {
            let entry = read_entry(&file)?;
            print_json(
                out,
                &json!({
                    "valid": true,
                    "commit": entry.commit.id,
                    "date": entry.date,
                    "benches": entry.benches.len(),
                }),
            )
        }

        Commands::Ingest { suite, file } => {
            let entry = read_entry(&file)?;
            let store = open_store(settings)?;

            let checks = RegressionEngine::new(store.store()).check_entry(
                &suite,
                &entry,
                settings.regression.window_size,
                settings.regression.threshold_stddevs,
            );
            let regressions: Vec<&str> = checks
                .iter()
                .filter(|c| c.is_regression)
                .map(|c| c.bench.as_str())
                .collect();

            let outcome = store.append(&suite, entry)?;
            print_json(
                out,
                &json!({
                    "suite": suite,
                    "outcome": outcome,
                    "regressions": regressions,
                }),
            )
        }

        Commands::Range { suite, from, to } => {
            let store = open_store(settings)?;
            let range = store.store().query_range(&suite, from, to);
            print_entries(out, &range.to_vec())
        }

        Commands::Commit { suite, id } => {
            let store = open_store(settings)?;
            print_entries(out, &store.store().query_by_commit(&suite, &id))
        }

        Commands::Latest { suite, count } => {
            let store = open_store(settings)?;
            print_entries(out, &store.store().latest(&suite, count))
        }

        Commands::Stats { suite, bench, window } => {
            let store = open_store(settings)?;
            let window = window.unwrap_or(settings.regression.window_size);
            let stats = RegressionEngine::new(store.store()).stats_for(&suite, &bench, window);
            print_json(
                out,
                &json!({
                    "suite": suite,
                    "bench": bench,
                    "window_size": window,
                    "stats": stats,
                }),
            )
        }

        Commands::Check {
            suite,
            file,
            window,
            threshold,
            markdown,
            fail_on_regression,
        } => {
            let entry = read_entry(&file)?;
            let store = open_store(settings)?;
            let window = window.unwrap_or(settings.regression.window_size);
            let threshold = threshold.unwrap_or(settings.regression.threshold_stddevs);

            let checks = RegressionEngine::new(store.store()).check_entry(&suite, &entry, window, threshold);
            if markdown {
                write!(out, "{}", markdown::regression_report(&suite, &checks, threshold))?;
            } else {
                print_json(out, &checks)?;
            }

            let flagged = checks.iter().filter(|c| c.is_regression).count();
            if flagged > 0 {
                eprintln!("{} {} regression(s) in {}", "warning:".yellow().bold(), flagged, suite);
                if fail_on_regression {
                    anyhow::bail!("{flagged} regression(s) detected in suite `{suite}`");
                }
            }
            Ok(())
        }

        Commands::Suites => {
            let store = open_store(settings)?;
            let suites: Vec<_> = store
                .store()
                .suites()
                .into_iter()
                .map(|name| {
                    let entries = store.store().len(&name);
                    json!({"suite": name, "entries": entries})
                })
                .collect();
            print_json(out, &suites)
        }

        Commands::Status { detailed } => {
            let store = open_store(settings)?;
            writeln!(out, "{}", "Benchmark History".bold())?;
            writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION"))?;
            writeln!(out, "Store: {}", store.location())?;
            writeln!(out, "Suites: {}", store.store().suites().len())?;
            writeln!(out, "Entries: {}", store.store().total_len())?;

            if detailed {
                writeln!(out)?;
                write!(out, "{}", markdown::history_summary(store.store()))?;
                writeln!(out)?;
                writeln!(out, "Regression window: {}", settings.regression.window_size)?;
                writeln!(out, "Regression threshold: {}σ", settings.regression.threshold_stddevs)?;
            }
            Ok(())
        }
    }
}

fn open_store(settings: &Settings) -> anyhow::Result<FileBackedStore> {
    let backend = JsonFileBackend::new(&settings.store.path);
    Ok(FileBackedStore::open(Box::new(backend), &settings.store.repo_url)?)
}

fn read_entry(file: &Path) -> anyhow::Result<BenchmarkEntry> {
    let text = if file == Path::new("-") {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text).context("failed to read stdin")?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?
    };
    let payload: serde_json::Value =
        serde_json::from_str(&text).map_err(|e| ValidationErrors::malformed(e.to_string()))?;
    Ok(validate_entry(&payload)?)
}

fn print_entries(out: &mut impl Write, entries: &[Arc<BenchmarkEntry>]) -> anyhow::Result<()> {
    let entries: Vec<&BenchmarkEntry> = entries.iter().map(Arc::as_ref).collect();
    print_json(out, &entries)
}

fn print_json<T: serde::Serialize + ?Sized>(out: &mut impl Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
