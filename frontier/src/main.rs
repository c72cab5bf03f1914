mod config;

use clap::{Args, Parser, Subcommand};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use report_router::errors::RouterError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(name = "frontier", about = "Collects browser error reports")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the report collector
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error(transparent)]
    Router(#[from] RouterError),
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        CliCommand::Run(args) => run(args),
    }
}

fn run(args: RunArgs) -> Result<(), CliError> {
    let config = Config::from_file(&args.config_file_path)?;

    // Keeps the sentry client alive until the process exits
    let _sentry_guard = init_logging(config.common.logging.as_ref());

    if let Some(metrics_config) = &config.common.metrics {
        init_metrics(metrics_config)?;
    }

    tracing::info!(path = %args.config_file_path.display(), "Starting frontier");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(report_router::run(config.frontier))?;
    Ok(())
}

fn init_logging(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let sentry_guard = config.map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let sentry_layer = sentry_guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    sentry_guard
}

fn init_metrics(config: &MetricsConfig) -> Result<(), CliError> {
    let recorder = StatsdBuilder::from(config.statsd_host.as_str(), config.statsd_port)
        .build(Some("frontier"))
        .map_err(|e| CliError::Metrics(e.to_string()))?;

    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;
    Ok(())
}
