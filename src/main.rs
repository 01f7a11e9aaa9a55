//! shopsense - replay and export recorded shopping sessions
//!
//! Reads an interaction trace captured by the viewer, rebuilds the session
//! with the study's settings and writes the JSON report or CSV summary.

use anyhow::Context;
use clap::{Parser, Subcommand};
use shopsense_rs::{
    config::StudyConfig,
    replay,
    session::{ExportFormat, FileSink, SessionRecorder},
};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "shopsense")]
#[command(about = "Replay and export virtual-store shopping sessions")]
#[command(version)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true, env = "SHOPSENSE_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a trace and export the session
    Replay {
        /// JSON-lines interaction trace
        trace: PathBuf,

        /// Study configuration (TOML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Export format: json or csv (study default when omitted)
        #[arg(long, short)]
        format: Option<String>,

        /// Output directory (study setting or app data dir when omitted)
        #[arg(long, short)]
        out: Option<PathBuf>,

        /// Print the export to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,

        /// Compact JSON
        #[arg(long)]
        compact: bool,
    },
    /// Replay a trace and print its statistics
    Stats {
        /// JSON-lines interaction trace
        trace: PathBuf,

        /// Study configuration (TOML or JSON)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Replay {
            trace,
            config,
            format,
            out,
            stdout,
            compact,
        } => {
            let study = load_study(config.as_deref())?;
            let recorder = replay_trace(&trace, &study)?;

            let format = match format {
                Some(f) => f,
                None => study.export.default_format.to_string(),
            };

            let pretty = study.export.pretty && !compact;
            if stdout {
                let body = match format.parse::<ExportFormat>()? {
                    ExportFormat::Json => recorder.export_serialized(pretty)?,
                    ExportFormat::Csv => recorder.export_summary_csv(),
                };
                println!("{}", body);
                return Ok(());
            }

            let dir = out
                .or_else(|| study.export.resolve_output_dir())
                .context("No output directory given and no app data directory available")?;
            let mut sink = FileSink::new(&dir);
            match recorder.download_as(&format, None, pretty, &mut sink)? {
                Some(name) => tracing::info!("Wrote {}", sink.dir().join(name).display()),
                None => anyhow::bail!("Unsupported export format: {}", format),
            }
        }
        Commands::Stats { trace, config } => {
            let study = load_study(config.as_deref())?;
            let recorder = replay_trace(&trace, &study)?;
            recorder.log_statistics();
            println!("{}", serde_json::to_string_pretty(&recorder.statistics())?);
        }
    }

    Ok(())
}

fn init_logging(
    log_file: Option<&Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,shopsense_rs=debug"))
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("Log file path has no file name")?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter()),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_study(path: Option<&Path>) -> anyhow::Result<StudyConfig> {
    match path {
        Some(path) => {
            tracing::info!("Loading study from {:?}", path);
            Ok(StudyConfig::load(path)?)
        }
        None => Ok(StudyConfig::default()),
    }
}

fn replay_trace(trace: &Path, study: &StudyConfig) -> anyhow::Result<SessionRecorder> {
    let entries = replay::load_trace(trace)?;
    Ok(replay::replay(
        study.session.clone(),
        study.recorder.clone(),
        &entries,
    ))
}
