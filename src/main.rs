use std::{env, fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use market_calendar::{
    config::{self, CalendarConfig},
    error::CalendarResult,
    pipeline::{Pipeline, RunSummary},
};
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const APP_NAME: &str = "market-calendar";

/// Builds the upcoming market-calendar CSV.
///
/// Settings are read from the environment (and an optional `.env` file);
/// flags override them.
#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about)]
struct Cli {
    /// Output CSV path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only events strictly after this date (YYYY-MM-DD) are kept.
    #[arg(long, value_parser = parse_cli_date)]
    current_date: Option<NaiveDate>,

    /// Year to fetch and compute expirations for.
    #[arg(long)]
    year: Option<i32>,

    /// Per-request HTTP timeout, e.g. `30s`.
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// JSON file extending the event-name id table.
    #[arg(long)]
    name_table: Option<PathBuf>,

    /// Alternative env file to load instead of `.env`.
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Write JSON logs to a file under the user state directory.
    #[arg(long)]
    log_file: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let _guard = init_tracing(cli.log_file)?;

    let cfg = apply_overrides(CalendarConfig::from_env()?, &cli)?;
    info!(
        current_date = %cfg.current_date,
        target_year = cfg.target_year,
        output = %cfg.output_path.display(),
        "Starting calendar build"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let summary = runtime.block_on(build(&cfg))?;

    for source in &summary.sources {
        match source.count {
            Some(count) => println!("{:<14} {count} events", source.name),
            None => println!("{:<14} failed (see logs)", source.name),
        }
    }
    println!("CSV generated: {}", summary.output.display());
    println!("Upcoming events encoded: {}", summary.written);

    Ok(())
}

async fn build(cfg: &CalendarConfig) -> CalendarResult<RunSummary> {
    Pipeline::from_config(cfg)?.run().await
}

fn apply_overrides(mut cfg: CalendarConfig, cli: &Cli) -> Result<CalendarConfig> {
    if let Some(date) = cli.current_date {
        cfg = cfg.with_current_date(date);
    }
    if let Some(year) = cli.year {
        let year = config::parse_year("--year", &year.to_string())?;
        cfg = cfg.with_target_year(year);
    }
    if let Some(timeout) = cli.timeout {
        cfg = cfg.with_http_timeout(timeout);
    }
    if let Some(output) = &cli.output {
        cfg = cfg.with_output_path(output);
    }
    if let Some(path) = &cli.name_table {
        cfg = cfg.with_name_table_path(path);
    }
    Ok(cfg)
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    config::parse_date("--current-date", value).map_err(|e| e.to_string())
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing(to_file: bool) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let in_container =
        env::var("CONTAINER").is_ok() || std::path::Path::new("/.dockerenv").exists();

    if to_file {
        let log_dir = dirs::state_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
            .context("Failed to find a state directory for logs")?
            .join(APP_NAME)
            .join("logs");
        fs::create_dir_all(&log_dir)?;

        let timestamp = time::OffsetDateTime::now_utc()
            .format(&format_description!(
                "[year][month][day]-[hour][minute][second]"
            ))
            .context("Failed to format timestamp")?;
        let file_name = format!("{APP_NAME}-{timestamp}.log");
        let file_path = log_dir.join(&file_name);

        let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!(log_file = %file_path.display(), "Logging to file");
        Ok(Some(guard))
    } else if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        Ok(None)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}
