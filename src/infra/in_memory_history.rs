use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::app::ports::HistoryStorePort;
use crate::domain::SampleRecord;
use crate::error::{ReportError, Result};

/// In-memory history store for development/testing
#[derive(Clone, Default)]
pub struct InMemoryHistoryStore {
    rows: Arc<Mutex<Vec<SampleRecord>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with previously persisted requests
    pub fn with_rows(rows: Vec<SampleRecord>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(rows)),
        }
    }

    pub fn rows(&self) -> Vec<SampleRecord> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl HistoryStorePort for InMemoryHistoryStore {
    async fn keys_after(&self, after: NaiveDate) -> Result<HashSet<String>> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| ReportError::Persistence("history lock poisoned".to_string()))?;
        Ok(rows
            .iter()
            .filter(|r| r.m_date > after)
            .map(|r| r.composite_key.clone())
            .collect())
    }

    async fn append(&self, records: &[SampleRecord]) -> Result<usize> {
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| ReportError::Persistence("history lock poisoned".to_string()))?;
        rows.extend_from_slice(records);
        debug!("Appended {} rows ({} total)", records.len(), rows.len());
        Ok(records.len())
    }
}
