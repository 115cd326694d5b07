use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Storage access failed for {location}: {message}")]
    Storage { location: String, message: String },

    #[error("Could not parse upload: {0}")]
    Parse(String),

    #[error("Upload is missing expected columns: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Stage '{stage}' has no input: {reason}")]
    MissingInput { stage: &'static str, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("XLSX writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReportError {
    pub fn storage(location: impl Into<String>, message: impl ToString) -> Self {
        ReportError::Storage {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn missing_input(stage: &'static str, reason: impl Into<String>) -> Self {
        ReportError::MissingInput {
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
