use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app::ports::{HistoryStorePort, ObjectStorePort};
use crate::app::run_report::{RunReport, Stage, StageStatus};
use crate::config::{Config, FailurePolicy};
use crate::constants::{self, archive_key, report_file_name};
use crate::domain::{Dataset, PostcodeValidity, UploadEvent};
use crate::error::{ReportError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::{load_table, RawTable};
use crate::pipeline::processing::age::classify_ages;
use crate::pipeline::processing::normalize::normalize;
use crate::pipeline::processing::summary::{display_valid_subset, summarize, IndexedRecord};
use crate::pipeline::processing::validity::{lookback_boundary, mark_duplicates};
use crate::pipeline::report::{render_fulfillment_report, render_sample_report, SampleReport};

/// Knobs for one run, usually taken from [`Config`]
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub archive_bucket: String,
    pub lookback_days: i64,
    pub header_rows: u32,
    pub sample_report_name: String,
    pub fulfillment_report_name: String,
    pub failure_policy: FailurePolicy,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            archive_bucket: config.storage.archive_bucket.clone(),
            lookback_days: config.history.lookback_days,
            header_rows: config.report.header_rows,
            sample_report_name: config.report.sample_report_name.clone(),
            fulfillment_report_name: config.report.fulfillment_report_name.clone(),
            failure_policy: config.run.failure_policy,
        }
    }
}

/// Use case turning one uploaded file into persisted history rows and reports
pub struct ProcessUploadUseCase {
    objects: Arc<dyn ObjectStorePort>,
    history: Arc<dyn HistoryStorePort>,
    settings: RunSettings,
}

impl ProcessUploadUseCase {
    pub fn new(
        objects: Arc<dyn ObjectStorePort>,
        history: Arc<dyn HistoryStorePort>,
        settings: RunSettings,
    ) -> Self {
        Self {
            objects,
            history,
            settings,
        }
    }

    /// Run every stage once for `event`, treating `today` as the run date.
    ///
    /// Under [`FailurePolicy::Continue`] a failed stage is logged and recorded
    /// and the next stage runs against whatever state exists. Under
    /// [`FailurePolicy::FailFast`] the first failure is returned.
    pub async fn run(&self, event: &UploadEvent, today: NaiveDate) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "run",
            run_id = %run_id,
            bucket = %event.bucket,
            file = %event.name
        );
        self.run_stages(run_id, event, today).instrument(span).await
    }

    async fn run_stages(&self, run_id: Uuid, event: &UploadEvent, today: NaiveDate) -> Result<RunReport> {
        let started = Instant::now();
        metrics::run::started();
        info!("Processing upload {}/{} for {}", event.bucket, event.name, today);

        let mut report = RunReport::new(run_id);

        let table = self.ingest(event).await;
        let table = self.record(&mut report, Stage::Ingest, table)?;

        let archived = self.archive(event, today).await;
        self.record(&mut report, Stage::Archive, archived)?;

        let dataset = match table.as_ref() {
            Some(table) => normalize(table),
            None => Err(ReportError::missing_input(Stage::Normalize.as_str(), "no table was ingested")),
        };
        let mut dataset = self.record(&mut report, Stage::Normalize, dataset)?;

        let classified = match dataset.as_mut() {
            Some(records) => {
                classify_ages(records, today);
                Ok(())
            }
            None => Err(missing_dataset(Stage::ClassifyAges)),
        };
        self.record(&mut report, Stage::ClassifyAges, classified)?;

        let checked = self.check_duplicates(dataset.as_mut(), today).await;
        self.record(&mut report, Stage::CheckDuplicates, checked)?;

        let persisted = self.persist(dataset.as_ref()).await;
        self.record(&mut report, Stage::Persist, persisted)?;

        let valid = match dataset.as_ref() {
            Some(records) => display_valid_subset(records),
            None => Err(missing_dataset(Stage::ValidSubset)),
        };
        let valid = self.record(&mut report, Stage::ValidSubset, valid)?;

        let summary = match dataset.as_ref() {
            Some(records) => summarize(records).map(|rows| {
                let bad_postcodes = records
                    .iter()
                    .filter(|r| PostcodeValidity::of(&r.postcode) == PostcodeValidity::Invalid)
                    .count();
                metrics::validation::invalid_postcodes(bad_postcodes);
                rows
            }),
            None => Err(missing_dataset(Stage::Summary)),
        };
        let summary = self.record(&mut report, Stage::Summary, summary)?;

        let sample_key = match (dataset.as_ref(), valid.as_ref(), summary.as_ref()) {
            (Some(records), Some(valid), Some(summary)) => {
                let rendered = SampleReport {
                    run_date: today,
                    header_rows: self.settings.header_rows,
                    summary,
                    dataset: records,
                    valid,
                };
                self.write_sample_report(&rendered).await
            }
            _ => Err(ReportError::missing_input(
                Stage::SampleReport.as_str(),
                "dataset, valid subset and summary are all required",
            )),
        };
        if let Some(key) = self.record(&mut report, Stage::SampleReport, sample_key)? {
            report.reports.push(key);
        }

        match valid.as_deref() {
            Some(valid) => match self.write_fulfillment_report(valid, today).await {
                Ok(Some(key)) => {
                    report.reports.push(key);
                    report.push(Stage::FulfillmentReport, StageStatus::Succeeded);
                }
                Ok(None) => {
                    warn!("No valid records to fulfil, skipping fulfillment report");
                    report.push(
                        Stage::FulfillmentReport,
                        StageStatus::Skipped("valid subset is empty".to_string()),
                    );
                }
                Err(e) => {
                    self.record::<()>(&mut report, Stage::FulfillmentReport, Err(e))?;
                }
            },
            None => {
                let missing = Err(ReportError::missing_input(
                    Stage::FulfillmentReport.as_str(),
                    "no valid subset was built",
                ));
                self.record::<()>(&mut report, Stage::FulfillmentReport, missing)?;
            }
        }

        report.dataset = dataset;
        report.valid = valid;
        report.summary = summary;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::run::finished(elapsed);
        let failed = report.failed_stages();
        if failed.is_empty() {
            info!("Run finished in {:.2}s, {} report(s) written", elapsed, report.reports.len());
        } else {
            warn!(
                "Run finished in {:.2}s with {} failed stage(s): {}",
                elapsed,
                failed.len(),
                failed.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            );
        }
        Ok(report)
    }

    /// Record a stage result. Returns the value on success, `Ok(None)` on a
    /// tolerated failure, and the error itself under fail-fast.
    fn record<T>(&self, report: &mut RunReport, stage: Stage, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => {
                report.push(stage, StageStatus::Succeeded);
                Ok(Some(value))
            }
            Err(e) => {
                error!(stage = stage.as_str(), "Stage {} failed: {}", stage, e);
                metrics::run::stage_failed(stage.as_str());
                report.push(stage, StageStatus::Failed(e.to_string()));
                match self.settings.failure_policy {
                    FailurePolicy::Continue => Ok(None),
                    FailurePolicy::FailFast => Err(e),
                }
            }
        }
    }

    async fn ingest(&self, event: &UploadEvent) -> Result<RawTable> {
        let bytes = self.objects.get(&event.bucket, &event.name).await?;
        metrics::ingest::upload_read(bytes.len());
        let table = load_table(&event.name, &bytes)?;
        metrics::ingest::rows_ingested(table.len());
        info!("Ingested {} rows with {} columns", table.len(), table.headers.len());
        Ok(table)
    }

    async fn archive(&self, event: &UploadEvent, today: NaiveDate) -> Result<()> {
        let key = archive_key(today, &event.name);
        self.objects
            .copy(&event.bucket, &event.name, &self.settings.archive_bucket, &key)
            .await?;
        self.objects.delete(&event.bucket, &event.name).await?;
        info!("Archived upload to {}/{}", self.settings.archive_bucket, key);
        Ok(())
    }

    async fn check_duplicates(&self, dataset: Option<&mut Dataset>, today: NaiveDate) -> Result<()> {
        let records = dataset.ok_or_else(|| missing_dataset(Stage::CheckDuplicates))?;
        let boundary = lookback_boundary(today, self.settings.lookback_days);
        let history = self.history.keys_after(boundary).await?;
        let stats = mark_duplicates(records, &history);
        metrics::validation::records_checked(stats.valid, stats.duplicates);
        info!(
            "Checked {} records against {} history keys after {}: {} valid, {} duplicates",
            records.len(),
            history.len(),
            boundary,
            stats.valid,
            stats.duplicates
        );
        Ok(())
    }

    async fn persist(&self, dataset: Option<&Dataset>) -> Result<()> {
        let records = dataset.ok_or_else(|| missing_dataset(Stage::Persist))?;
        let written = self.history.append(records).await?;
        metrics::persistence::rows_persisted(written);
        info!("Persisted {} rows to history", written);
        Ok(())
    }

    async fn write_sample_report(&self, report: &SampleReport<'_>) -> Result<String> {
        let bytes = render_sample_report(report)?;
        let key = report_key(report.run_date, &self.settings.sample_report_name);
        metrics::report::written("sample", bytes.len());
        self.objects.put(&self.settings.archive_bucket, &key, bytes).await?;
        info!("Wrote sample report {}/{}", self.settings.archive_bucket, key);
        Ok(key)
    }

    async fn write_fulfillment_report(&self, valid: &[IndexedRecord], today: NaiveDate) -> Result<Option<String>> {
        let Some(bytes) = render_fulfillment_report(valid, self.settings.header_rows)? else {
            return Ok(None);
        };
        let key = report_key(today, &self.settings.fulfillment_report_name);
        metrics::report::written("fulfillment", bytes.len());
        self.objects.put(&self.settings.archive_bucket, &key, bytes).await?;
        info!("Wrote fulfillment report {}/{}", self.settings.archive_bucket, key);
        Ok(Some(key))
    }
}

fn missing_dataset(stage: Stage) -> ReportError {
    ReportError::missing_input(stage.as_str(), "no normalized dataset")
}

fn report_key(run_date: NaiveDate, report: &str) -> String {
    format!("{}{}", constants::REPORTS_PREFIX, report_file_name(run_date, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordStatus;
    use crate::infra::InMemoryHistoryStore;
    use crate::pipeline::processing::tests_support::record;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockObjectStore {
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    }

    impl MockObjectStore {
        fn with_object(bucket: &str, name: &str, bytes: &[u8]) -> Self {
            let store = Self::default();
            store
                .objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), name.to_string()), bytes.to_vec());
            store
        }

        fn contains(&self, bucket: &str, name: &str) -> bool {
            self.objects
                .lock()
                .unwrap()
                .contains_key(&(bucket.to_string(), name.to_string()))
        }
    }

    #[async_trait]
    impl ObjectStorePort for MockObjectStore {
        async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), name.to_string()))
                .cloned()
                .ok_or_else(|| ReportError::storage(format!("{}/{}", bucket, name), "not found"))
        }

        async fn put(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<()> {
            self.objects
                .lock()
                .unwrap()
                .insert((bucket.to_string(), name.to_string()), bytes);
            Ok(())
        }

        async fn copy(&self, src_bucket: &str, name: &str, dst_bucket: &str, dst_name: &str) -> Result<()> {
            let bytes = self.get(src_bucket, name).await?;
            self.put(dst_bucket, dst_name, bytes).await
        }

        async fn delete(&self, bucket: &str, name: &str) -> Result<()> {
            self.objects
                .lock()
                .unwrap()
                .remove(&(bucket.to_string(), name.to_string()));
            Ok(())
        }
    }

    const HEADER: &str = "Created,First Name,Last Name,Email,Mobile,Address,State,Town,Zip,Pregnant,Child name,Child gender,Child birth date,Source,Product,Status,Type";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn event() -> UploadEvent {
        UploadEvent {
            name: "upload.csv".to_string(),
            bucket: "incoming".to_string(),
        }
    }

    fn use_case(objects: Arc<MockObjectStore>, history: InMemoryHistoryStore, policy: FailurePolicy) -> ProcessUploadUseCase {
        let settings = RunSettings {
            failure_policy: policy,
            ..RunSettings::default()
        };
        ProcessUploadUseCase::new(objects, Arc::new(history), settings)
    }

    #[tokio::test]
    async fn test_full_run_marks_history_duplicate() {
        let csv = format!(
            "{HEADER}\n\
             2026-10-15,Ana,Lee,a@x.com,0111,1 Road,KL,KL,40000,no,Kid,F,2025-01-01,web,Gold,new,lead\n\
             2026-10-16,Ben,Tan,b@x.com,0222,2 Road,KL,KL,40000,yes,,,,web,Gold,new,lead\n"
        );
        let objects = Arc::new(MockObjectStore::with_object("incoming", "upload.csv", csv.as_bytes()));
        let history = InMemoryHistoryStore::with_rows(vec![record("0111", "Gold", today() - Duration::days(10))]);
        let report = use_case(objects.clone(), history.clone(), FailurePolicy::Continue)
            .run(&event(), today())
            .await
            .unwrap();

        assert!(report.is_success(), "failed: {:?}", report.failed_stages());
        let dataset = report.dataset.as_ref().unwrap();
        assert_eq!(dataset[0].status, Some(RecordStatus::DuplicateInLookback));
        assert_eq!(dataset[1].status, Some(RecordStatus::Valid));
        assert_eq!(history.rows().len(), 3);

        assert!(!objects.contains("incoming", "upload.csv"));
        assert!(objects.contains("wyeth_processed", "processed/2026-10-18_upload.csv"));
        assert!(objects.contains("wyeth_processed", "reports/2026-10-18_wyeth_sample_report.xlsx"));
        assert!(objects.contains("wyeth_processed", "reports/2026-10-18_wyeth_fulfillments.xlsx"));
    }

    #[tokio::test]
    async fn test_missing_upload_fails_every_stage_under_continue() {
        let objects = Arc::new(MockObjectStore::default());
        let report = use_case(objects, InMemoryHistoryStore::new(), FailurePolicy::Continue)
            .run(&event(), today())
            .await
            .unwrap();

        assert_eq!(report.failed_stages(), Stage::ALL.to_vec());
        assert!(report.reports.is_empty());
    }

    #[tokio::test]
    async fn test_all_duplicates_skips_fulfillment() {
        let csv = format!("{HEADER}\n2026-10-15,Ana,Lee,a@x.com,0111,1 Road,KL,KL,40000,no,,,,web,Gold,new,lead\n");
        let objects = Arc::new(MockObjectStore::with_object("incoming", "upload.csv", csv.as_bytes()));
        let history = InMemoryHistoryStore::with_rows(vec![record("0111", "Gold", today() - Duration::days(1))]);
        let report = use_case(objects, history, FailurePolicy::FailFast)
            .run(&event(), today())
            .await
            .unwrap();

        assert!(matches!(
            report.status(Stage::FulfillmentReport),
            Some(StageStatus::Skipped(_))
        ));
        assert_eq!(report.reports, vec!["reports/2026-10-18_wyeth_sample_report.xlsx".to_string()]);
    }

    #[tokio::test]
    async fn test_fail_fast_stops_at_ingest() {
        let objects = Arc::new(MockObjectStore::default());
        let result = use_case(objects, InMemoryHistoryStore::new(), FailurePolicy::FailFast)
            .run(&event(), today())
            .await;

        assert!(matches!(result, Err(ReportError::Storage { .. })));
    }
}
