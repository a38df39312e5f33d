//! CLI entry point for the transit network scorer.
//!
//! Provides subcommands for scoring a simulation run and for validating a
//! configuration without reading any records.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use transit_net_scorer::{
    calculator::ScoreCalculator,
    config::{RecordFormat, ScorerConfig},
    error::ScoreError,
    metadata::NetworkMetadata,
    output::{Endianness, ScoreReport, append_report, write_score},
};

/// Exit status when logging cannot be set up; distinct from every [`ScoreError`] status.
const LOGGING_EXIT_CODE: u8 = 4;

#[derive(Parser)]
#[command(name = "transit_net_scorer")]
#[command(about = "Scores a simulated transit network from simulation output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the composite score and write it as a raw 8-byte double
    Score {
        /// JSON configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// File to write the score to, or "-" for stdout
        #[arg(short, long, default_value = "score.bin")]
        output: String,

        /// Encoding of the record sets
        #[arg(short, long, value_enum, default_value_t = RecordFormat::Csv)]
        format: RecordFormat,

        /// Byte order of the score
        #[arg(short, long, value_enum, default_value_t = Endianness::Big)]
        endianness: Endianness,

        /// Evaluate metrics concurrently
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Optional: CSV file to append per-metric values and the score to
        #[arg(long)]
        report: Option<String>,
    },
    /// Load and validate the configuration and network metadata
    CheckConfig {
        /// JSON configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Encoding of the record sets
        #[arg(short, long, value_enum, default_value_t = RecordFormat::Csv)]
        format: RecordFormat,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = match init_tracing() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e:#}");
            return ExitCode::from(LOGGING_EXIT_CODE);
        }
    };

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            config,
            output,
            format,
            endianness,
            parallel,
            report,
        } => score(&config, &output, format, endianness, parallel, report.as_deref()).await,
        Commands::CheckConfig { config, format } => check_config(&config, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Scoring run failed");
            ExitCode::from(e.exit_code())
        }
    }
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/transit_net_scorer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("transit_net_scorer.log"));

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(log_file_name.to_string_lossy())
        .build(log_dir)?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(log_filter("RUST_LOG", LevelFilter::INFO));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(log_filter("RUST_LOG_JSON", LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()?;

    Ok(file_guard)
}

/// Filter from the directives in `env_var`, or `default` when it is unset or empty.
fn log_filter(env_var: &str, default: LevelFilter) -> EnvFilter {
    filter_from(&std::env::var(env_var).unwrap_or_default(), default)
}

fn filter_from(directives: &str, default: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default.into())
        .parse_lossy(directives)
}

#[tracing::instrument(skip_all, fields(config = %config.display(), ?format, parallel = parallel))]
async fn score(
    config: &Path,
    output: &str,
    format: RecordFormat,
    endianness: Endianness,
    parallel: bool,
    report: Option<&str>,
) -> Result<(), ScoreError> {
    let config = ScorerConfig::load(config)?;
    let calculator = ScoreCalculator::from_config(&config, format)?;

    let run = if parallel {
        calculator.calculate_parallel().await?
    } else {
        calculator.calculate()?
    };

    write_score(output, run.score, endianness)?;

    if let Some(path) = report {
        append_report(path, &ScoreReport::new(&run.metrics, run.score))?;
        info!(path, "Run report appended");
    }

    Ok(())
}

#[tracing::instrument(skip_all, fields(config = %config.display(), ?format))]
fn check_config(config: &Path, format: RecordFormat) -> Result<(), ScoreError> {
    let config = ScorerConfig::load(config)?;
    let metadata = NetworkMetadata::load(config.metadata_path())?;
    let sources = config.record_sources(format)?;

    for source in [&sources.passengers, &sources.delays, &sources.trips] {
        let path = source.path();
        if path.exists() {
            info!(path = %path.display(), "Record set found");
        } else {
            warn!(path = %path.display(), "Record set not found");
        }
    }

    info!(
        weights = ?config.weights(),
        ?metadata,
        "Configuration is valid"
    );
    Ok(())
}
