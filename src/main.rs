//! `ticketsync` command-line entry point.
//!
//! Exit status is 0 when the run completed, even if individual tickets or
//! pull requests failed, and 1 when configuration, authentication, or the
//! snapshot load failed. Argument errors exit with 2.

use camino::Utf8PathBuf;
use clap::Parser;
use mockable::DefaultClock;
use std::process::ExitCode;
use std::sync::Arc;
use ticketsync::config::{DEFAULT_CONFIG_PATH, load_config};
use ticketsync::sync::adapters::{GitHubClient, JiraClient};
use ticketsync::sync::services::SyncRunner;
use ticketsync::telemetry::{LogFormat, init_tracing};
use tracing::{error, info};

/// Sync ticket status with linked pull requests.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: Utf8PathBuf,

    /// Reconcile existing tickets only; never create new ones.
    #[arg(long)]
    skip_generation: bool,

    /// Override `run.max_concurrency`.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Log line layout.
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if init_tracing(cli.log_format).is_err() {
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "sync run aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut config = load_config(&cli.config)?;
    if let Some(limit) = cli.max_concurrency {
        config.run.max_concurrency = limit;
        config.validate()?;
    }

    let tracker = Arc::new(JiraClient::new(config.jira_settings())?);
    let host = Arc::new(GitHubClient::new(&config.github_settings()?)?);
    let account = tracker.authenticate().await?;
    info!(account = %account, config = %cli.config, "authenticated with issue tracker");

    let settings = config.run_settings(cli.skip_generation)?;
    if settings.generator.is_none() {
        info!("ticket generation disabled");
    }
    let runner = SyncRunner::new(tracker, host, Arc::new(DefaultClock), settings);
    runner.run().await?;
    Ok(())
}
