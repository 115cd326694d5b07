//! Metrics for the upload pipeline
//!
//! Recording functions are grouped by phase and go through [`MetricName`] so
//! metric names are never spelled out at call sites.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::fmt;
use tracing::info;

/// Every metric the pipeline emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Run metrics
    RunsStarted,
    RunDuration,
    StageFailures,

    // Ingest metrics
    UploadBytes,
    RowsIngested,

    // Validation metrics
    RecordsValid,
    RecordsDuplicate,
    RecordsInvalidPostcode,

    // Persistence metrics
    RowsPersisted,

    // Report metrics
    ReportsWritten,
    ReportBytes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RunsStarted => "sample_report_runs_started_total",
            MetricName::RunDuration => "sample_report_run_duration_seconds",
            MetricName::StageFailures => "sample_report_stage_failures_total",
            MetricName::UploadBytes => "sample_report_upload_bytes",
            MetricName::RowsIngested => "sample_report_rows_ingested_total",
            MetricName::RecordsValid => "sample_report_records_valid_total",
            MetricName::RecordsDuplicate => "sample_report_records_duplicate_total",
            MetricName::RecordsInvalidPostcode => "sample_report_records_invalid_postcode_total",
            MetricName::RowsPersisted => "sample_report_rows_persisted_total",
            MetricName::ReportsWritten => "sample_report_reports_written_total",
            MetricName::ReportBytes => "sample_report_report_bytes",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|h| h.render())
}

pub mod run {
    use super::MetricName;

    pub fn started() {
        ::metrics::counter!(MetricName::RunsStarted.as_str()).increment(1);
    }

    pub fn finished(duration_secs: f64) {
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(duration_secs);
    }

    pub fn stage_failed(stage: &'static str) {
        ::metrics::counter!(MetricName::StageFailures.as_str(), "stage" => stage).increment(1);
    }
}

pub mod ingest {
    use super::MetricName;

    pub fn upload_read(bytes: usize) {
        ::metrics::histogram!(MetricName::UploadBytes.as_str()).record(bytes as f64);
    }

    pub fn rows_ingested(rows: usize) {
        ::metrics::counter!(MetricName::RowsIngested.as_str()).increment(rows as u64);
    }
}

pub mod validation {
    use super::MetricName;

    pub fn records_checked(valid: usize, duplicates: usize) {
        ::metrics::counter!(MetricName::RecordsValid.as_str()).increment(valid as u64);
        ::metrics::counter!(MetricName::RecordsDuplicate.as_str()).increment(duplicates as u64);
    }

    pub fn invalid_postcodes(count: usize) {
        ::metrics::counter!(MetricName::RecordsInvalidPostcode.as_str()).increment(count as u64);
    }
}

pub mod persistence {
    use super::MetricName;

    pub fn rows_persisted(rows: usize) {
        ::metrics::counter!(MetricName::RowsPersisted.as_str()).increment(rows as u64);
    }
}

pub mod report {
    use super::MetricName;

    pub fn written(report: &'static str, bytes: usize) {
        ::metrics::counter!(MetricName::ReportsWritten.as_str(), "report" => report).increment(1);
        ::metrics::histogram!(MetricName::ReportBytes.as_str(), "report" => report).record(bytes as f64);
    }
}
