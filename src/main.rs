//! zerogate - Zero-Tolerance Quality Gate Aggregator
//!
//! Runs the checks in `zerogate.toml` and exits `0` only if every one of
//! them passed with zero errors.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use zerogate::config::write_starter;
use zerogate::{
    compute_verdict, render_report, select_checks, ConfigOverrides, ConfigValidator, ExecutionMode,
    FileSink, GateConfig, GateError, HistoryLog, ProcessRunner, QualityGateAggregator,
    ReportFormat, ReportSink, StdoutSink, DEFAULT_CONFIG_FILE, DEFAULT_HISTORY_FILE,
};

#[derive(Parser)]
#[command(name = "zerogate")]
#[command(version)]
#[command(about = "Zero-tolerance quality gate: every check must pass with zero errors", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all configured checks and report the verdict
    Run(RunArgs),

    /// Validate the configuration without running any check
    Validate,

    /// Write a starter configuration
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Show recent runs from the history log
    History {
        /// History file to read
        #[arg(long, default_value = DEFAULT_HISTORY_FILE)]
        file: PathBuf,

        /// Number of runs to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Execution mode (overrides the configuration)
    #[arg(long, value_enum)]
    mode: Option<ExecutionMode>,

    /// Skip remaining checks after the first failure (sequential mode)
    #[arg(long)]
    fail_fast: bool,

    /// Default per-check timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ReportFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Append a summary of this run to a history log
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,

    /// Run only the named check (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_filter = if verbose {
        "zerogate=debug,info"
    } else {
        "zerogate=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Exit code after SIGINT/SIGTERM, shell style (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Resolves when SIGINT or SIGTERM arrives.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers: {}", e);
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, stopping running checks"),
        _ = sigint.recv() => info!("Received SIGINT, stopping running checks"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, stopping running checks"),
        Err(e) => {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

// Must return rather than `process::exit`: runtime shutdown drops checks
// still running, which kills their process groups.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            e.downcast_ref::<GateError>()
                .map_or(1, GateError::exit_code)
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Commands::Run(args) => run_gate(&cli.config, args).await,
        Commands::Validate => Ok(validate_config(&cli.config)),
        Commands::Init { force } => {
            write_starter(&cli.config, force)?;
            println!(
                "{} Wrote starter configuration to {}",
                "OK".green().bold(),
                cli.config.display()
            );
            Ok(0)
        }
        Commands::History { file, limit, json } => show_history(&file, limit, json),
    }
}

async fn run_gate(config_path: &Path, args: RunArgs) -> anyhow::Result<i32> {
    let overrides = ConfigOverrides {
        mode: args.mode,
        fail_fast: args.fail_fast.then_some(true),
        timeout_ms: args.timeout_ms,
    };
    let config = GateConfig::load(config_path)?.with_overrides(&overrides);
    let options = config.run_options()?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let checks = select_checks(config.check_definitions(base_dir)?, &args.only)?;

    let aggregator = QualityGateAggregator::new(Arc::new(ProcessRunner::new()), options);
    // Dropping the run on a signal kills every check's process group.
    let report = tokio::select! {
        report = aggregator.run_all(&checks) => report?,
        () = shutdown_signal() => {
            eprintln!("{} run interrupted, checks stopped", "FAILED".red().bold());
            return Ok(INTERRUPTED_EXIT_CODE);
        }
    };
    let verdict = compute_verdict(&report);

    let rendered = render_report(&report, args.format);
    match args.output {
        Some(ref path) => FileSink::new(path)
            .emit(&rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => StdoutSink.emit(&rendered)?,
    }

    if let Some(ref path) = args.history {
        // The verdict stands even if the history cannot be recorded.
        if let Err(e) = HistoryLog::new(path).append(&report) {
            warn!("Failed to record run history: {}", e);
        }
    }

    let summary = format!(
        "{} error(s), {} warning(s) across {} check(s)",
        report.total_errors(),
        report.total_warnings(),
        report.results().len()
    );
    if verdict.passed {
        eprintln!("{} {}", "PASSED".green().bold(), summary);
    } else {
        eprintln!("{} {}", "FAILED".red().bold(), summary);
    }

    Ok(verdict.exit_code)
}

fn validate_config(config_path: &Path) -> i32 {
    let report = ConfigValidator::new(config_path).validate();

    for (name, program) in &report.programs {
        match program {
            Some(path) => println!("  {} {} -> {}", "OK".green(), name, path.display()),
            None => println!("  {} {}", "??".yellow(), name),
        }
    }
    for warning in &report.warnings {
        println!("{} {}", "Warning:".yellow(), warning);
    }
    for error in &report.errors {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    if report.is_valid() {
        println!(
            "{} {} is valid",
            "OK".green().bold(),
            config_path.display()
        );
    }
    report.exit_code()
}

fn show_history(file: &Path, limit: usize, json: bool) -> anyhow::Result<i32> {
    let entries = HistoryLog::new(file).recent(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(0);
    }

    if entries.is_empty() {
        println!("No runs recorded in {}", file.display());
        return Ok(0);
    }

    for entry in &entries {
        let verdict = if entry.passed {
            "PASSED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        let mut line = format!(
            "{}  {}  errors={} warnings={}  {}ms",
            entry.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            verdict,
            entry.total_errors,
            entry.total_warnings,
            entry.total_duration_ms
        );
        if !entry.failed.is_empty() {
            line.push_str(&format!("  failed: {}", entry.failed.join(", ")));
        }
        println!("{}", line);
    }
    Ok(0)
}
