use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use sample_report::app::ports::HistoryStorePort;
use sample_report::app::{ProcessUploadUseCase, RunReport, RunSettings, StageStatus};
use sample_report::config::{Config, FailurePolicy};
use sample_report::domain::UploadEvent;
use sample_report::infra::{open_history_store, FsObjectStore, SqliteHistoryStore};
use sample_report::{logging, observability};

#[derive(Parser)]
#[command(name = "sample_report")]
#[command(about = "Process sample-request uploads into history rows and XLSX reports")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today instead of the local date
    #[arg(long, global = true)]
    run_date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one uploaded file
    Process {
        /// Bucket holding the upload
        #[arg(long)]
        bucket: String,
        /// Object name of the upload
        #[arg(long)]
        name: String,
    },
    /// Process the upload described by a JSON event payload
    Event {
        /// File containing {"name": "...", "bucket": "..."}
        #[arg(long)]
        payload: PathBuf,
    },
    /// Count history keys newer than a date
    History {
        #[arg(long)]
        since: NaiveDate,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)?.with_env_overrides()?,
        None => Config::load()?,
    };
    Ok(config)
}

fn read_event(path: &PathBuf) -> Result<UploadEvent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event payload {}", path.display()))?;
    let event: UploadEvent = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid event payload {}", path.display()))?;
    Ok(event)
}

fn print_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    for outcome in &report.stages {
        match &outcome.status {
            StageStatus::Succeeded => println!("  ✅ {}", outcome.stage),
            StageStatus::Skipped(reason) => println!("  ⏭️  {} ({})", outcome.stage, reason),
            StageStatus::Failed(message) => println!("  ❌ {}: {}", outcome.stage, message),
        }
    }
    for key in &report.reports {
        println!("  📄 {}", key);
    }
}

async fn process(config: &Config, event: UploadEvent, today: NaiveDate) -> Result<()> {
    let objects = Arc::new(FsObjectStore::new(&config.storage.root));
    // An unopenable store fails the duplicate check and persist stages, not the run
    let history = open_history_store(&config.history.database, &config.history.table);
    let use_case = ProcessUploadUseCase::new(objects, history, RunSettings::from_config(config));

    let report = use_case.run(&event, today).await?;
    print_report(&report);
    if !report.is_success() {
        // Under the continue policy a failed stage is logged, not surfaced
        warn!("{} stage(s) failed", report.failed_stages().len());
    }
    Ok(())
}

/// `{:#}` without repeating a cause its wrapper already prints
fn error_chain(err: &anyhow::Error) -> String {
    let mut rendered = String::new();
    for cause in err.chain() {
        let message = cause.to_string();
        if rendered.contains(&message) {
            continue;
        }
        if !rendered.is_empty() {
            rendered.push_str(": ");
        }
        rendered.push_str(&message);
    }
    rendered
}

fn write_metrics_snapshot(config: &Config) {
    let (Some(path), Some(text)) = (config.metrics.snapshot_path.as_ref(), observability::render()) else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(path, text) {
        Ok(()) => info!("Wrote metrics snapshot to {}", path.display()),
        Err(e) => warn!("Failed to write metrics snapshot {}: {}", path.display(), e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    logging::init_logging(&config.storage.log_dir);
    if let Err(e) = observability::init() {
        warn!("Metrics disabled: {}", e);
    }

    let today = cli.run_date.unwrap_or_else(|| Local::now().date_naive());

    let result = match cli.command {
        Commands::Process { bucket, name } => process(&config, UploadEvent { name, bucket }, today).await,
        Commands::Event { payload } => {
            let event = read_event(&payload)?;
            process(&config, event, today).await
        }
        Commands::History { since } => {
            let store = SqliteHistoryStore::open(&config.history.database, &config.history.table)?;
            let keys = store.keys_after(since).await?;
            println!("{} keys newer than {}", keys.len(), since);
            return Ok(());
        }
    };

    write_metrics_snapshot(&config);
    run_exit(config.run.failure_policy, result)
}

/// Exit status of a `process`/`event` run. Nothing is surfaced to the trigger
/// in continue mode.
fn run_exit(policy: FailurePolicy, result: Result<()>) -> Result<()> {
    match result {
        Err(e) => {
            error!("Run failed: {}", error_chain(&e));
            match policy {
                FailurePolicy::Continue => Ok(()),
                FailurePolicy::FailFast => Err(e),
            }
        }
        ok => ok,
    }
}
