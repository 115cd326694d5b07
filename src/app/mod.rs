pub mod ports;
pub mod report_use_case;
pub mod run_report;

pub use report_use_case::{ProcessUploadUseCase, RunSettings};
pub use run_report::{RunReport, Stage, StageOutcome, StageStatus};
