//! Linear backward walk from the newest record.
//!
//! Visits every record newer than the window before reaching it, so it is
//! slow for old windows, but it needs nothing except `fetch_before` and
//! always terminates.

use tracing::debug;

use crate::collect::WindowCollector;
use crate::error::RetrievalError;
use crate::models::{cmp_newest_first, RetrievalResult, StrategyKind, TimeWindow};
use crate::store::{RemoteStore, MAX_BATCH};

/// Walk `fetch_before` from the newest record until the batch reaches past
/// `window.start`, the stream ends, or `max` records have been collected.
///
/// `batch_size` is clamped to [`MAX_BATCH`].
pub async fn linear_fetch(
    store: &dyn RemoteStore,
    channel_id: &str,
    window: &TimeWindow,
    max: usize,
    batch_size: usize,
) -> Result<RetrievalResult, RetrievalError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH);
    let mut collector = WindowCollector::new(*window, max);
    let mut cursor: Option<u64> = None;

    while !collector.is_full() {
        let before = cursor.map(|c| c.to_string());
        let mut batch = store
            .fetch_before(channel_id, before.as_deref(), batch_size)
            .await
            .map_err(RetrievalError::remote)?;
        collector.record_call();

        if batch.is_empty() {
            break;
        }
        batch.sort_by(cmp_newest_first);

        for record in &batch {
            collector.offer(record);
            if collector.is_full() {
                break;
            }
        }

        let oldest = &batch[batch.len() - 1];
        debug!(
            batch = batch.len(),
            oldest = %oldest.created_at,
            collected = collector.len(),
            "linear batch"
        );
        if oldest.created_at < window.start() || batch.len() < batch_size {
            break;
        }
        let next = oldest.id_value();
        if cursor.is_some_and(|c| next >= c) {
            break;
        }
        cursor = Some(next);
    }

    Ok(collector.finish(StrategyKind::LinearBackward))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Anchor;
    use crate::models::RemoteRecord;
    use crate::expand::expand;
    use crate::store::memory::{synthetic_record, InMemoryRemoteStore};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeSet;

    fn stream(n: i64, step_minutes: i64) -> Vec<RemoteRecord> {
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| synthetic_record(t0 + Duration::minutes(i * step_minutes), 0, "bob"))
            .collect()
    }

    #[tokio::test]
    async fn test_linear_collects_window() {
        let recs = stream(500, 5);
        let store = InMemoryRemoteStore::new().with_records("c", recs.clone());
        let w = TimeWindow::new(recs[100].created_at, recs[199].created_at).unwrap();
        let result = linear_fetch(&store, "c", &w, 10_000, 100).await.unwrap();
        assert_eq!(result.records.len(), 100);
        assert_eq!(result.strategy, StrategyKind::LinearBackward);
        // 400..499, 300..399, 200..299, 100..199, 0..99 (crosses start)
        assert_eq!(result.call_count, 5);
    }

    #[tokio::test]
    async fn test_linear_matches_expander() {
        let recs = stream(800, 3);
        let store = InMemoryRemoteStore::new().with_records("c", recs.clone());
        let w = TimeWindow::new(
            recs[211].created_at - Duration::seconds(30),
            recs[612].created_at + Duration::seconds(30),
        )
        .unwrap();

        let linear = linear_fetch(&store, "c", &w, 10_000, 37).await.unwrap();
        let anchor = Anchor::InWindow(recs[400].clone());
        let expanded = expand(&store, "c", &anchor, &w, 10_000, 37).await.unwrap();

        let a: BTreeSet<_> = linear.ids().into_iter().collect();
        let b: BTreeSet<_> = expanded.ids().into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 402);
        assert_eq!(linear.ids(), expanded.ids());
    }

    #[tokio::test]
    async fn test_linear_truncates() {
        let recs = stream(300, 1);
        let store = InMemoryRemoteStore::new().with_records("c", recs.clone());
        let w = TimeWindow::new(recs[0].created_at, recs[299].created_at).unwrap();
        let result = linear_fetch(&store, "c", &w, 25, 100).await.unwrap();
        assert_eq!(result.records.len(), 25);
        assert!(result.truncated);
        // Newest first, so the 25th accepted is the 25th from the top.
        assert_eq!(result.boundary_timestamp, Some(recs[275].created_at));
        assert_eq!(result.call_count, 1);
    }

    #[tokio::test]
    async fn test_linear_oversized_batch_size_is_clamped() {
        let recs = stream(1_000, 1);
        let store = InMemoryRemoteStore::new().with_records("c", recs.clone());
        let w = TimeWindow::new(recs[100].created_at, recs[899].created_at).unwrap();
        let result = linear_fetch(&store, "c", &w, 10_000, 500).await.unwrap();
        assert_eq!(result.records.len(), 800);
        assert!(!result.truncated);
        // Ten full batches of 100, the last one reaching past the start.
        assert_eq!(result.call_count, 10);
    }

    #[tokio::test]
    async fn test_linear_empty_stream() {
        let store = InMemoryRemoteStore::new();
        let w = TimeWindow::from_millis(1_700_000_000_000, 1_700_000_100_000).unwrap();
        let result = linear_fetch(&store, "c", &w, 10, 100).await.unwrap();
        assert!(result.records.is_empty());
        assert!(!result.truncated);
        assert_eq!(result.call_count, 1);
    }
}
