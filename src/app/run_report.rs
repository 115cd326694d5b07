use std::fmt;
use uuid::Uuid;

use crate::domain::{Dataset, SummaryRow};
use crate::pipeline::processing::summary::IndexedRecord;

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Ingest,
    Archive,
    Normalize,
    ClassifyAges,
    CheckDuplicates,
    Persist,
    ValidSubset,
    Summary,
    SampleReport,
    FulfillmentReport,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::Ingest,
        Stage::Archive,
        Stage::Normalize,
        Stage::ClassifyAges,
        Stage::CheckDuplicates,
        Stage::Persist,
        Stage::ValidSubset,
        Stage::Summary,
        Stage::SampleReport,
        Stage::FulfillmentReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Archive => "archive",
            Stage::Normalize => "normalize",
            Stage::ClassifyAges => "classify_ages",
            Stage::CheckDuplicates => "check_duplicates",
            Stage::Persist => "persist",
            Stage::ValidSubset => "valid_subset",
            Stage::Summary => "summary",
            Stage::SampleReport => "sample_report",
            Stage::FulfillmentReport => "fulfillment_report",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Succeeded,
    /// Failed with the rendered error message
    Failed(String),
    /// Ran but had nothing to do
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
}

/// What happened during one invocation, plus the state it left behind
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub stages: Vec<StageOutcome>,
    pub dataset: Option<Dataset>,
    pub valid: Option<Vec<IndexedRecord>>,
    pub summary: Option<Vec<SummaryRow>>,
    /// Object keys of the reports uploaded to the archive bucket
    pub reports: Vec<String>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            stages: Vec::with_capacity(Stage::ALL.len()),
            dataset: None,
            valid: None,
            summary: None,
            reports: Vec::new(),
        }
    }

    pub fn push(&mut self, stage: Stage, status: StageStatus) {
        self.stages.push(StageOutcome { stage, status });
    }

    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.iter().find(|o| o.stage == stage).map(|o| &o.status)
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|o| matches!(o.status, StageStatus::Failed(_)))
            .map(|o| o.stage)
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.failed_stages().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_stages_in_order() {
        let mut report = RunReport::new(Uuid::new_v4());
        report.push(Stage::Ingest, StageStatus::Succeeded);
        report.push(Stage::Normalize, StageStatus::Failed("bad".into()));
        report.push(Stage::FulfillmentReport, StageStatus::Skipped("empty".into()));
        report.push(Stage::Summary, StageStatus::Failed("no input".into()));

        assert_eq!(report.failed_stages(), vec![Stage::Normalize, Stage::Summary]);
        assert!(!report.is_success());
        assert_eq!(report.status(Stage::Ingest), Some(&StageStatus::Succeeded));
        assert_eq!(report.status(Stage::Archive), None);
    }
}
