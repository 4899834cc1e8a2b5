//! birdcast - Post new RSS/Atom feed items to Mastodon

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use libbirdcast::config::Config;
use libbirdcast::feed::HttpFeedSource;
use libbirdcast::logging::{self, LogFormat};
use libbirdcast::platforms::mastodon::MastodonPublisher;
use libbirdcast::processor::sync_all;
use libbirdcast::trash::trash_account;
use libbirdcast::{BirdcastError, RunOptions};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "birdcast")]
#[command(version)]
#[command(about = "Post new RSS/Atom feed items to Mastodon", long_about = None)]
struct Cli {
    /// Configuration file (default: $BIRDCAST_CONFIG or ~/.config/birdcast/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Only process this account
    #[arg(short, long, value_name = "NAME")]
    account: Option<String>,

    /// Delete every post of this account and exit
    #[arg(long, value_name = "NAME", conflicts_with_all = ["account", "dry_run"])]
    trash: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Fetch and log what would be posted without posting or saving state
    #[arg(long, visible_alias = "noop")]
    dry_run: bool,

    /// Log output format (text, json, pretty)
    #[arg(long, value_name = "FORMAT", env = "BIRDCAST_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init_cli(cli.log_format, cli.debug);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<BirdcastError>()
                .map_or(1, BirdcastError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };

    let source = HttpFeedSource::new(&config.user_agent)?;
    let publisher = MastodonPublisher::new(&config.server, &config.user_agent)?;

    if let Some(name) = &cli.trash {
        let report = trash_account(&config, &publisher, name).await?;
        println!("Deleted {} posts ({} failed)", report.deleted, report.failed);
        return Ok(if report.failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let options = RunOptions {
        dry_run: cli.dry_run,
        only_account: cli.account,
    };
    let runs = sync_all(&config, options, &source, &publisher).await?;

    let failed: Vec<&str> = runs
        .iter()
        .filter(|run| !run.is_ok())
        .map(|run| run.account.as_str())
        .collect();

    if failed.is_empty() {
        info!("All {} accounts synchronized", runs.len());
        Ok(ExitCode::SUCCESS)
    } else {
        error!("Failed accounts: {}", failed.join(", "));
        Ok(ExitCode::FAILURE)
    }
}
