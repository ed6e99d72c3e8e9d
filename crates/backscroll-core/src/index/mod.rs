//! Local record index abstraction.
//!
//! A [`RecordIndex`] is an append-only log of [`IndexedRecord`]s keyed by
//! `(channel, year, month)` of each record's UTC creation time. It serves
//! as a cache in front of the remote store: the retriever asks it first and
//! only goes remote on a miss.
//!
//! Appends are not deduplicated; readers that need unique IDs deduplicate
//! themselves.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Datelike;

use crate::models::{IndexedRecord, RemoteRecord, TimeWindow};

/// `(year, month)` partition of the index.
pub type MonthKey = (i32, u32);

#[async_trait]
pub trait RecordIndex: Send + Sync {
    /// Append one record to its channel/month partition.
    async fn append(&self, channel_id: &str, record: &RemoteRecord) -> Result<()>;

    /// Append many records; returns how many were written.
    async fn append_all(&self, channel_id: &str, records: &[RemoteRecord]) -> Result<usize> {
        for r in records {
            self.append(channel_id, r).await?;
        }
        Ok(records.len())
    }

    /// All records in `window`, ascending by creation time. Duplicated
    /// appends come back duplicated.
    async fn query_range(&self, channel_id: &str, window: &TimeWindow)
        -> Result<Vec<IndexedRecord>>;
}

/// Partition a record belongs to.
pub fn month_of(record: &RemoteRecord) -> MonthKey {
    (record.created_at.year(), record.created_at.month())
}

/// Every `(year, month)` overlapping `window`, oldest first.
pub fn months_overlapping(window: &TimeWindow) -> Vec<MonthKey> {
    let (mut y, mut m) = (window.start().year(), window.start().month());
    let last = (window.end().year(), window.end().month());
    let mut months = Vec::new();
    while (y, m) <= last {
        months.push((y, m));
        if m == 12 {
            y += 1;
            m = 1;
        } else {
            m += 1;
        }
    }
    months
}

/// Keep rows inside `window` and order them by time, then ID.
pub fn filter_window(rows: Vec<IndexedRecord>, window: &TimeWindow) -> Vec<IndexedRecord> {
    let (lo, hi) = (window.start_ms(), window.end_ms());
    let mut kept: Vec<IndexedRecord> = rows
        .into_iter()
        .filter(|r| (lo..=hi).contains(&r.created_timestamp))
        .collect();
    kept.sort_by(|a, b| {
        a.created_timestamp
            .cmp(&b.created_timestamp)
            .then_with(|| id_order(&a.id).cmp(&id_order(&b.id)))
    });
    kept
}

fn id_order(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}
