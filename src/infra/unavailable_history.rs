use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::error;

use crate::app::ports::HistoryStorePort;
use crate::domain::SampleRecord;
use crate::error::{ReportError, Result};
use crate::infra::SqliteHistoryStore;

/// Open the SQLite history, or an [`UnavailableHistoryStore`] carrying the
/// open error when that fails.
pub fn open_history_store<P: AsRef<Path>>(db_path: P, table: &str) -> Arc<dyn HistoryStorePort> {
    match SqliteHistoryStore::open(db_path.as_ref(), table) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                "Failed to open history store {}: {}",
                db_path.as_ref().display(),
                e
            );
            Arc::new(UnavailableHistoryStore::new(e.to_string()))
        }
    }
}

/// Stands in for a history store that could not be opened.
///
/// Every call fails with the open error, so the duplicate check and persist
/// stages fail on their own while the rest of the run goes ahead.
pub struct UnavailableHistoryStore {
    reason: String,
}

impl UnavailableHistoryStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn error(&self) -> ReportError {
        ReportError::Persistence(format!("history store unavailable: {}", self.reason))
    }
}

#[async_trait]
impl HistoryStorePort for UnavailableHistoryStore {
    async fn keys_after(&self, _after: NaiveDate) -> Result<HashSet<String>> {
        Err(self.error())
    }

    async fn append(&self, _records: &[SampleRecord]) -> Result<usize> {
        Err(self.error())
    }
}
