pub(crate) mod api;
mod cli;
pub(crate) mod diff;
mod error;
pub(crate) mod filter;
mod logging;
pub(crate) mod matcher;
pub(crate) mod pipeline;
pub(crate) mod report;
pub(crate) mod schedule;

pub(crate) use error::{AppError, AppResult};

use std::process::exit;

use clap::Parser;
use time::OffsetDateTime;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    logging::setup_logger(&cli.verbosity);
    if let Err(err) = run(cli).await {
        error!("{}", err);
        exit(1);
    }
}

async fn run(cli: cli::Cli) -> AppResult<()> {
    let config = cli.run_config()?;
    let api = api::BitbucketClient::new(
        cli.api_url.as_str(),
        cli.user.as_str(),
        cli.password.as_str(),
    )?;
    let sink = pipeline::StdoutSink;

    if cli.now {
        let summary = pipeline::run_pipeline(&api, &sink, &config).await?;
        info!(?summary, "scan finished");
        return Ok(());
    }

    // Startup validation: a watcher without a usable trigger must not start.
    let spec = match cli.schedule.as_deref() {
        Some(raw) => schedule::ScheduleSpec::parse(raw)?,
        None => return Err(AppError::EmptySchedule),
    };
    info!(
        schedule = cli.schedule.as_deref().unwrap_or_default(),
        watch_list = ?config.watch_list,
        "watcher started"
    );

    loop {
        let now = OffsetDateTime::now_utc();
        let next = spec.next_after(now);
        info!(%next, "next scan scheduled");
        tokio::time::sleep((next - now).unsigned_abs()).await;
        // A failed scan is logged and the watcher waits for the next trigger.
        match pipeline::run_pipeline(&api, &sink, &config).await {
            Ok(summary) => info!(?summary, "scan finished"),
            Err(err) => error!("scan failed: {}", err),
        }
    }
}
