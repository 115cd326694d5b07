use crate::constants;
use crate::error::{ReportError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

// A1..A4 of each data sheet hold the report description
const MIN_HEADER_ROWS: u32 = 4;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub history: HistoryConfig,
    pub report: ReportConfig,
    pub run: RunConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per bucket
    pub root: PathBuf,
    /// Bucket receiving archived uploads and rendered reports
    pub archive_bucket: String,
    pub log_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            archive_bucket: constants::ARCHIVE_BUCKET.to_string(),
            log_dir: "logs".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub database: PathBuf,
    pub table: String,
    pub lookback_days: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("data/history/wyeth_samples.db"),
            table: constants::HISTORY_TABLE.to_string(),
            lookback_days: constants::LOOKBACK_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Rows reserved above each data table for the descriptive header text
    pub header_rows: u32,
    pub sample_report_name: String,
    pub fulfillment_report_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            header_rows: constants::REPORT_HEADER_ROWS,
            sample_report_name: constants::SAMPLE_REPORT_NAME.to_string(),
            fulfillment_report_name: constants::FULFILLMENT_REPORT_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Log a failed stage and keep going with whatever state exists
    #[default]
    Continue,
    /// Stop at the first failed stage and hand the error back
    FailFast,
}

impl std::str::FromStr for FailurePolicy {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "fail_fast" | "fail-fast" => Ok(FailurePolicy::FailFast),
            other => Err(ReportError::Config(format!("unknown failure policy '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Where to write the Prometheus text snapshot after a run
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    /// Load `config.toml` from the working directory, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new(DEFAULT_CONFIG_PATH);
        let config = if path.exists() {
            Self::load_from(path)?
        } else {
            info!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
            Config::default()
        };
        config.with_env_overrides()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Some(root) = non_empty_env("SAMPLE_REPORT_DATA_ROOT") {
            self.storage.root = PathBuf::from(root);
        }
        if let Some(db) = non_empty_env("SAMPLE_REPORT_HISTORY_DB") {
            self.history.database = PathBuf::from(db);
        }
        if let Some(policy) = non_empty_env("SAMPLE_REPORT_FAILURE_POLICY") {
            self.run.failure_policy = policy.parse()?;
        }
        if self.history.lookback_days < 0 {
            return Err(ReportError::Config(format!(
                "history.lookback_days must not be negative (got {})",
                self.history.lookback_days
            )));
        }
        if self.report.header_rows < MIN_HEADER_ROWS {
            return Err(ReportError::Config(format!(
                "report.header_rows must be at least {} to hold the description lines (got {})",
                MIN_HEADER_ROWS, self.report.header_rows
            )));
        }
        Ok(self)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}
