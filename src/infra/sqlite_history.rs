use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

use crate::app::ports::HistoryStorePort;
use crate::error::{ReportError, Result};
use crate::domain::SampleRecord;

const DATE_FMT: &str = "%Y-%m-%d";

/// SQLite-backed history of processed sample requests.
///
/// Dates are stored as ISO `YYYY-MM-DD` text so range filters compare correctly.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteHistoryStore {
    pub fn open<P: AsRef<Path>>(db_path: P, table: &str) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, table)
    }

    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ReportError::Config(format!("invalid history table name '{}'", table)));
        }
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                m_date         TEXT NOT NULL,
                firstname      TEXT,
                lastname       TEXT,
                email          TEXT,
                mobileno       TEXT,
                address1       TEXT,
                state          TEXT,
                city           TEXT,
                postcode       TEXT,
                pregnant       INTEGER,
                childname      TEXT,
                child_gender   TEXT,
                childdob       TEXT,
                m_source       TEXT,
                m_product      TEXT,
                composite_key  TEXT NOT NULL,
                estimateage    TEXT,
                status         TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_m_date ON {table} (m_date);
            "#,
            table = table
        ))?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ReportError::Persistence("history connection lock poisoned".to_string()))
    }

    /// Number of stored rows, all dates
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get(0)
        })?;
        Ok(n as usize)
    }
}

#[async_trait]
impl HistoryStorePort for SqliteHistoryStore {
    async fn keys_after(&self, after: NaiveDate) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT composite_key FROM {} WHERE m_date > ?1",
            self.table
        ))?;
        let rows = stmt.query_map(params![after.format(DATE_FMT).to_string()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut keys = HashSet::new();
        for key in rows {
            keys.insert(key?);
        }
        debug!("Loaded {} history keys after {}", keys.len(), after);
        Ok(keys)
    }

    async fn append(&self, records: &[SampleRecord]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| ReportError::Persistence(e.to_string()))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (m_date, firstname, lastname, email, mobileno, address1, state, city,
                    postcode, pregnant, childname, child_gender, childdob, m_source, m_product,
                    composite_key, estimateage, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                self.table
            ))?;
            for r in records {
                stmt.execute(params![
                    r.m_date.format(DATE_FMT).to_string(),
                    r.firstname,
                    r.lastname,
                    r.email,
                    r.mobileno,
                    r.address1,
                    r.state,
                    r.city,
                    r.postcode,
                    r.pregnant,
                    r.childname,
                    r.child_gender,
                    r.childdob.map(|d| d.format(DATE_FMT).to_string()),
                    r.m_source,
                    r.m_product,
                    r.composite_key,
                    r.estimateage.map(|a| a.label()),
                    r.status.map(|s| s.label()),
                ])
                .map_err(|e| ReportError::Persistence(e.to_string()))?;
            }
        }
        tx.commit()
            .map_err(|e| ReportError::Persistence(e.to_string()))?;
        Ok(records.len())
    }
}
