/// Source column names mapped to canonical record fields
pub const COLUMN_RENAMES: [(&str, &str); 15] = [
    ("Created", "m_date"),
    ("First Name", "firstname"),
    ("Last Name", "lastname"),
    ("Email", "email"),
    ("Mobile", "mobileno"),
    ("Address", "address1"),
    ("State", "state"),
    ("Town", "city"),
    ("Zip", "postcode"),
    ("Pregnant", "pregnant"),
    ("Child name", "childname"),
    ("Child gender", "child_gender"),
    ("Child birth date", "childdob"),
    ("Source", "m_source"),
    ("Product", "m_product"),
];

/// Columns every upload must carry and which are dropped after validation
pub const REQUIRED_DROPPED_COLUMNS: [&str; 2] = ["Status", "Type"];

/// Dropped when present, ignored when absent
pub const OPTIONAL_DROPPED_COLUMN: &str = "Photo";

pub const COMPOSITE_KEY_SEPARATOR: &str = "_";

pub const STATUS_VALID: &str = "Valid";
pub const STATUS_DUPLICATE: &str = "Duplicate Found In Last 6 Months";
pub const POSTCODE_VALID: &str = "Valid";
pub const POSTCODE_INVALID: &str = "Invalid Postcode";
pub const FINAL_VALID: &str = "Valid";
pub const FINAL_INVALID: &str = "Invalid";

pub const POSTCODE_LENGTH: usize = 5;

pub const LOOKBACK_DAYS: i64 = 60;
pub const HISTORY_TABLE: &str = "wyeth_samples";

pub const ARCHIVE_BUCKET: &str = "wyeth_processed";
pub const ARCHIVE_PREFIX: &str = "processed/";
pub const REPORTS_PREFIX: &str = "reports/";

pub const SAMPLE_REPORT_NAME: &str = "wyeth_sample_report";
pub const FULFILLMENT_REPORT_NAME: &str = "wyeth_fulfillments";
pub const REPORT_HEADER_ROWS: u32 = 5;

pub const SHEET_SUMMARY: &str = "Summary";
pub const SHEET_ALL_DATA: &str = "All Data";
pub const SHEET_VALID_DATA: &str = "Valid Data";

/// Canonical column order used for persistence and the data sheets
pub const RECORD_COLUMNS: [&str; 18] = [
    "m_date",
    "firstname",
    "lastname",
    "email",
    "mobileno",
    "address1",
    "state",
    "city",
    "postcode",
    "pregnant",
    "childname",
    "child_gender",
    "childdob",
    "m_source",
    "m_product",
    "composite_key",
    "estimateage",
    "status",
];

/// Look up the canonical name for a source column
pub fn canonical_column(source: &str) -> Option<&'static str> {
    COLUMN_RENAMES
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
}

/// Archive key for a processed upload: `processed/<date>_<name>`
pub fn archive_key(run_date: chrono::NaiveDate, file_name: &str) -> String {
    format!("{}{}_{}", ARCHIVE_PREFIX, run_date.format("%Y-%m-%d"), file_name)
}

/// Report file name: `<date>_<report>.xlsx`
pub fn report_file_name(run_date: chrono::NaiveDate, report: &str) -> String {
    format!("{}_{}.xlsx", run_date.format("%Y-%m-%d"), report)
}
