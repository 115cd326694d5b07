// Upload pipeline: ingestion, processing, and report rendering

pub mod ingestion;
pub mod processing;
pub mod report;
