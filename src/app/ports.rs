use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

use crate::domain::SampleRecord;
use crate::error::Result;

/// Bucketed object storage holding uploads, archives and rendered reports
#[async_trait]
pub trait ObjectStorePort: Send + Sync {
    async fn get(&self, bucket: &str, name: &str) -> Result<Vec<u8>>;
    async fn put(&self, bucket: &str, name: &str, bytes: Vec<u8>) -> Result<()>;
    async fn copy(&self, src_bucket: &str, name: &str, dst_bucket: &str, dst_name: &str) -> Result<()>;
    async fn delete(&self, bucket: &str, name: &str) -> Result<()>;
}

/// Durable store of every sample request processed so far
#[async_trait]
pub trait HistoryStorePort: Send + Sync {
    /// Composite keys of stored requests whose `m_date` is strictly after `after`
    async fn keys_after(&self, after: NaiveDate) -> Result<HashSet<String>>;

    /// Append enriched records, duplicates included; returns rows written
    async fn append(&self, records: &[SampleRecord]) -> Result<usize>;
}
