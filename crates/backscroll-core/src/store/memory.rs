//! In-memory [`RemoteStore`] for tests and offline simulation.
//!
//! Records are held per channel in ascending ID order and served with the
//! remote API's cursor semantics. The store counts calls and can be told
//! to fail specific operations or to return overlapping batches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Author, RemoteRecord};
use crate::snowflake::{self, TIMESTAMP_SHIFT};

use super::{RemoteStore, MAX_BATCH};

/// A remote primitive, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOp {
    Before,
    After,
    Around,
}

/// Simulated remote record stream.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    channels: HashMap<String, Vec<RemoteRecord>>,
    failing: Vec<FetchOp>,
    overlapping: bool,
    calls: AtomicUsize,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records to a channel. Order does not matter.
    pub fn with_records(mut self, channel_id: &str, records: Vec<RemoteRecord>) -> Self {
        let list = self.channels.entry(channel_id.to_string()).or_default();
        list.extend(records);
        list.sort_by_key(RemoteRecord::id_value);
        list.dedup_by_key(|r| r.id_value());
        self
    }

    /// Make every call of `op` fail with a transport-style error.
    pub fn failing_on(mut self, op: FetchOp) -> Self {
        self.failing.push(op);
        self
    }

    /// Re-send the record at the cursor in each `before`/`after` batch, the
    /// way overlapping pagination windows do.
    pub fn with_overlapping_batches(mut self) -> Self {
        self.overlapping = true;
        self
    }

    /// Total calls served (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn begin(&self, op: FetchOp) -> Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.failing.contains(&op) {
            bail!("simulated transport failure on {:?}", op);
        }
        Ok(())
    }

    fn channel(&self, channel_id: &str) -> &[RemoteRecord] {
        self.channels
            .get(channel_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn parse_cursor(cursor: &str) -> Result<u64> {
    match cursor.parse() {
        Ok(v) => Ok(v),
        Err(_) => bail!("invalid snowflake cursor: {:?}", cursor),
    }
}

fn newest_first(mut batch: Vec<RemoteRecord>) -> Vec<RemoteRecord> {
    batch.reverse();
    batch
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn fetch_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.begin(FetchOp::Before)?;
        let limit = limit.clamp(1, MAX_BATCH);
        let records = self.channel(channel_id);
        let (end, echo) = match before {
            None => (records.len(), None),
            Some(c) => {
                let c = parse_cursor(c)?;
                let end = records.partition_point(|r| r.id_value() < c);
                let echo = records.get(end).filter(|r| r.id_value() == c);
                (end, echo)
            }
        };
        let start = end.saturating_sub(limit);
        let mut batch = records[start..end].to_vec();
        if self.overlapping {
            batch.extend(echo.cloned());
        }
        Ok(newest_first(batch))
    }

    async fn fetch_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.begin(FetchOp::After)?;
        let limit = limit.clamp(1, MAX_BATCH);
        let records = self.channel(channel_id);
        let c = parse_cursor(after)?;
        let start = records.partition_point(|r| r.id_value() <= c);
        let end = (start + limit).min(records.len());
        let mut batch = Vec::with_capacity(end - start + 1);
        if self.overlapping && start > 0 && records[start - 1].id_value() == c {
            batch.push(records[start - 1].clone());
        }
        batch.extend_from_slice(&records[start..end]);
        Ok(newest_first(batch))
    }

    async fn fetch_around(
        &self,
        channel_id: &str,
        around: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.begin(FetchOp::Around)?;
        let limit = limit.clamp(1, MAX_BATCH);
        let records = self.channel(channel_id);
        let c = parse_cursor(around)?;
        let pivot = records.partition_point(|r| r.id_value() < c);
        let newer = limit.div_ceil(2);
        let older = limit - newer;
        let start = pivot.saturating_sub(older);
        let end = (pivot + newer).min(records.len());
        Ok(newest_first(records[start..end].to_vec()))
    }
}

/// Build a record whose ID encodes `created_at`, with `seq` in the low bits
/// so several records can share a millisecond.
pub fn synthetic_record(created_at: DateTime<Utc>, seq: u32, author: &str) -> RemoteRecord {
    let base = snowflake::to_id(created_at).unwrap_or(0);
    let id = base | u64::from(seq & ((1 << TIMESTAMP_SHIFT) - 1));
    RemoteRecord {
        id: id.to_string(),
        author: Author {
            id: format!("u-{}", author),
            username: author.to_string(),
        },
        content: format!("message {} from {}", id, author),
        created_at,
    }
}
