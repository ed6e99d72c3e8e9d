//! In-memory [`RecordIndex`] for testing and embedding.
//!
//! Partitions are `Vec`s behind a `std::sync::RwLock`, mirroring the
//! on-disk layout one `Vec` per channel/month.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{IndexedRecord, RemoteRecord, TimeWindow};

use super::{filter_window, month_of, months_overlapping, MonthKey, RecordIndex};

type PartitionKey = (String, MonthKey);

/// In-memory append-only index.
#[derive(Default)]
pub struct InMemoryIndex {
    partitions: RwLock<HashMap<PartitionKey, Vec<IndexedRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines in one partition.
    pub fn partition_len(&self, channel_id: &str, month: MonthKey) -> usize {
        self.partitions
            .read()
            .map(|p| p.get(&(channel_id.to_string(), month)).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

#[async_trait]
impl RecordIndex for InMemoryIndex {
    async fn append(&self, channel_id: &str, record: &RemoteRecord) -> Result<()> {
        let mut parts = self
            .partitions
            .write()
            .map_err(|_| anyhow!("index lock poisoned"))?;
        parts
            .entry((channel_id.to_string(), month_of(record)))
            .or_default()
            .push(IndexedRecord::from(record));
        Ok(())
    }

    async fn query_range(
        &self,
        channel_id: &str,
        window: &TimeWindow,
    ) -> Result<Vec<IndexedRecord>> {
        let parts = self
            .partitions
            .read()
            .map_err(|_| anyhow!("index lock poisoned"))?;
        let mut rows = Vec::new();
        for month in months_overlapping(window) {
            if let Some(p) = parts.get(&(channel_id.to_string(), month)) {
                rows.extend(p.iter().cloned());
            }
        }
        Ok(filter_window(rows, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::synthetic_record;
    use chrono::{Duration, TimeZone, Utc};

    #[tokio::test]
    async fn test_query_returns_window_subset_in_order() {
        let index = InMemoryIndex::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap();
        let recs: Vec<_> = (0..6)
            .map(|i| synthetic_record(t0 + Duration::hours(i), 0, "ada"))
            .collect();
        // Append out of order.
        for i in [3, 0, 5, 1, 4, 2] {
            index.append("c", &recs[i]).await.unwrap();
        }
        assert_eq!(index.partition_len("c", (2024, 1)), 2);
        assert_eq!(index.partition_len("c", (2024, 2)), 4);

        let w = TimeWindow::new(recs[1].created_at, recs[4].created_at).unwrap();
        let got = index.query_range("c", &w).await.unwrap();
        let ids: Vec<_> = got.iter().map(|r| r.id.clone()).collect();
        let want: Vec<_> = recs[1..=4].iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, want);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let index = InMemoryIndex::new();
        let r = synthetic_record(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(), 0, "ada");
        index.append("a", &r).await.unwrap();
        let w = TimeWindow::new(r.created_at, r.created_at).unwrap();
        assert_eq!(index.query_range("a", &w).await.unwrap().len(), 1);
        assert!(index.query_range("b", &w).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_appends_are_kept() {
        let index = InMemoryIndex::new();
        let r = synthetic_record(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(), 0, "ada");
        index.append_all("a", &[r.clone(), r.clone()]).await.unwrap();
        let w = TimeWindow::new(r.created_at, r.created_at).unwrap();
        assert_eq!(index.query_range("a", &w).await.unwrap().len(), 2);
    }
}
