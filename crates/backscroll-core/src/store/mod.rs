//! Remote record-stream abstraction.
//!
//! The [`RemoteStore`] trait covers the three cursor primitives the
//! retrieval strategies need. The stream is reverse-chronological and
//! addressed by snowflake IDs; cursors are exclusive.
//!
//! | Method | Returns |
//! |--------|---------|
//! | [`fetch_before`](RemoteStore::fetch_before) | up to `limit` records older than the cursor (or the newest records) |
//! | [`fetch_after`](RemoteStore::fetch_after) | up to `limit` records newer than the cursor, nearest first |
//! | [`fetch_around`](RemoteStore::fetch_around) | up to `limit` records clustered around an ID |
//!
//! Batches are nominally newest-first, but callers must not rely on it:
//! real stores can return overlapping or reordered batches across calls.

pub mod memory;

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use crate::models::RemoteRecord;

/// Largest `limit` the remote side honours per call.
pub const MAX_BATCH: usize = 100;

/// Read-only cursor access to one remote record stream per channel.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Records strictly older than `before`; `None` starts at the newest.
    async fn fetch_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>>;

    /// Records strictly newer than `after`.
    async fn fetch_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>>;

    /// Records near `around`, which need not be an existing ID.
    async fn fetch_around(
        &self,
        channel_id: &str,
        around: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>>;
}

/// Wraps a store and counts every call made through it.
pub struct CountingStore<'a> {
    inner: &'a dyn RemoteStore,
    calls: AtomicUsize,
}

impl<'a> CountingStore<'a> {
    pub fn new(inner: &'a dyn RemoteStore) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RemoteStore for CountingStore<'_> {
    async fn fetch_before(
        &self,
        channel_id: &str,
        before: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.tick();
        self.inner.fetch_before(channel_id, before, limit).await
    }

    async fn fetch_after(
        &self,
        channel_id: &str,
        after: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.tick();
        self.inner.fetch_after(channel_id, after, limit).await
    }

    async fn fetch_around(
        &self,
        channel_id: &str,
        around: &str,
        limit: usize,
    ) -> Result<Vec<RemoteRecord>> {
        self.tick();
        self.inner.fetch_around(channel_id, around, limit).await
    }
}
