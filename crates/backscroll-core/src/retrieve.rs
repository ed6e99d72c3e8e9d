//! Retrieval orchestration.
//!
//! ```text
//! retrieve(channel, window, max)
//!   │
//!   ├─ local index hit? ──────────────────────────────▶ LocalIndex (0 calls)
//!   │      (index error: warn, treat as miss)
//!   ├─ anchored-bidirectional ── ok ──┐
//!   │      │ err: warn                ├─ backfill index ─▶ result
//!   └─ linear-backward ──────── ok ───┘
//!          │ err
//!          ▼
//!     RetrievalError::Exhausted
//! ```
//!
//! A window with any indexed record is treated as fully indexed. Partially
//! indexed windows are not topped up from the remote store.
//!
//! Backfill only follows a lookup that ran and came back empty. When the
//! lookup is disabled or failed, the index may already hold the window and
//! appending again would duplicate it.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use tracing::{info, warn};

use crate::collect::WindowCollector;
use crate::error::RetrievalError;
use crate::index::RecordIndex;
use crate::models::{RemoteRecord, RetrievalResult, StrategyKind, TimeWindow};
use crate::store::{CountingStore, RemoteStore};
use crate::strategy::{AnchoredStrategy, FetchStrategy, LinearStrategy};

/// Knobs for a [`Retriever`], decoupled from any configuration format.
#[derive(Debug, Clone)]
pub struct RetrievalParams {
    pub max_records: usize,
    /// `limit` for `before`/`after` walks.
    pub batch_size: usize,
    /// `limit` for anchor probes.
    pub anchor_batch_size: usize,
    pub anchor_retries: u32,
    /// Widening step per anchor retry.
    pub widen: Duration,
    /// Consult the index before going remote.
    pub use_index: bool,
    /// Append complete remote results to the index after a confirmed miss.
    pub backfill: bool,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            max_records: 500,
            batch_size: 100,
            anchor_batch_size: 100,
            anchor_retries: 2,
            widen: Duration::days(1),
            use_index: true,
            backfill: true,
        }
    }
}

/// Composes the index and the remote strategies into one call.
pub struct Retriever {
    store: Arc<dyn RemoteStore>,
    index: Option<Arc<dyn RecordIndex>>,
    params: RetrievalParams,
    primary: Box<dyn FetchStrategy>,
    fallback: Box<dyn FetchStrategy>,
}

impl Retriever {
    pub fn new(store: Arc<dyn RemoteStore>, params: RetrievalParams) -> Self {
        let primary = AnchoredStrategy::new(
            params.anchor_batch_size,
            params.anchor_retries,
            params.widen,
            params.batch_size,
        );
        let fallback = LinearStrategy {
            batch_size: params.batch_size,
        };
        Self {
            store,
            index: None,
            params,
            primary: Box::new(primary),
            fallback: Box::new(fallback),
        }
    }

    pub fn with_index(mut self, index: Arc<dyn RecordIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn params(&self) -> &RetrievalParams {
        &self.params
    }

    /// Retrieve up to `max` records of `window`, oldest first.
    ///
    /// Fails only when both remote strategies fail.
    pub async fn retrieve(
        &self,
        channel_id: &str,
        window: &TimeWindow,
        max: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let mut index_missed = false;
        if self.params.use_index {
            if let Some(index) = &self.index {
                match self.from_index(index.as_ref(), channel_id, window, max).await {
                    Ok(Some(hit)) => {
                        info!(
                            channel = channel_id,
                            records = hit.records.len(),
                            "served from local index"
                        );
                        return Ok(hit);
                    }
                    Ok(None) => index_missed = true,
                    Err(e) => warn!(channel = channel_id, error = %e, "index query failed"),
                }
            }
        }

        let started = Instant::now();
        let counting = CountingStore::new(self.store.as_ref());

        let outcome = match self.primary.fetch(&counting, channel_id, window, max).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(
                    strategy = %self.primary.kind(),
                    error = %e,
                    "falling back to {}",
                    self.fallback.kind()
                );
                self.fallback.fetch(&counting, channel_id, window, max).await
            }
        };

        let mut result = outcome.map_err(|e| {
            warn!(strategy = %self.fallback.kind(), error = %e, "fallback failed");
            RetrievalError::exhausted(e)
        })?;
        result.call_count = counting.calls();
        result.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            channel = channel_id,
            strategy = %result.strategy,
            records = result.records.len(),
            calls = result.call_count,
            truncated = result.truncated,
            elapsed_ms = result.elapsed_ms,
            "remote retrieval finished"
        );

        if index_missed {
            self.backfill(channel_id, &result).await;
        }
        Ok(result)
    }

    async fn from_index(
        &self,
        index: &dyn RecordIndex,
        channel_id: &str,
        window: &TimeWindow,
        max: usize,
    ) -> Result<Option<RetrievalResult>, RetrievalError> {
        let started = Instant::now();
        let rows = index
            .query_range(channel_id, window)
            .await
            .map_err(RetrievalError::index_io)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.id.clone()) {
                continue;
            }
            match RemoteRecord::try_from(row) {
                Ok(r) => records.push(r),
                Err(e) => warn!(error = %e, "skipping unreadable index row"),
            }
        }

        let mut collector = WindowCollector::new(*window, max);
        for r in &records {
            collector.offer(r);
            if collector.is_full() {
                break;
            }
        }
        if collector.is_empty() {
            return Ok(None);
        }
        let mut result = collector.finish(StrategyKind::LocalIndex);
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(Some(result))
    }

    async fn backfill(&self, channel_id: &str, result: &RetrievalResult) {
        let Some(index) = &self.index else {
            return;
        };
        if !self.params.backfill || result.truncated || result.records.is_empty() {
            return;
        }
        match index.append_all(channel_id, &result.records).await {
            Ok(n) => info!(channel = channel_id, records = n, "backfilled index"),
            Err(e) => warn!(
                channel = channel_id,
                error = %RetrievalError::index_io(e),
                "backfill failed"
            ),
        }
    }
}
