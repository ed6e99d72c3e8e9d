//! Bidirectional expansion from an anchor.
//!
//! Two cursor walks leave the anchor in opposite directions, one batch each
//! per round:
//!
//! ```text
//!        window.start                      window.end
//!   ◀── before ── │ ◀──────── anchor ────────▶ │ ── after ──▶
//!   stop on first │                            │ stop on first
//!   older record  │                            │ newer record
//! ```
//!
//! A walk stops when it crosses its window edge, when the store returns an
//! empty or short batch, or when its cursor fails to advance. "Short" is
//! measured against the limit the store actually honours, so a
//! `batch_size` above [`MAX_BATCH`] is clamped first. Reaching the
//! record cap halts both walks at once.

use tracing::debug;

use crate::anchor::Anchor;
use crate::collect::{Offer, WindowCollector};
use crate::error::RetrievalError;
use crate::models::{cmp_newest_first, RemoteRecord, RetrievalResult, StrategyKind, TimeWindow};
use crate::store::{RemoteStore, MAX_BATCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Backward,
    Forward,
}

struct Walk {
    direction: Direction,
    cursor: u64,
    active: bool,
}

impl Walk {
    fn new(direction: Direction, cursor: u64) -> Self {
        Self {
            direction,
            cursor,
            active: true,
        }
    }

    /// Fetch the next batch and feed it to the collector.
    async fn step(
        &mut self,
        store: &dyn RemoteStore,
        channel_id: &str,
        batch_size: usize,
        collector: &mut WindowCollector,
    ) -> Result<(), RetrievalError> {
        let cursor = self.cursor.to_string();
        let mut batch = match self.direction {
            Direction::Backward => {
                store
                    .fetch_before(channel_id, Some(&cursor), batch_size)
                    .await
            }
            Direction::Forward => store.fetch_after(channel_id, &cursor, batch_size).await,
        }
        .map_err(RetrievalError::remote)?;
        collector.record_call();

        if batch.is_empty() {
            self.active = false;
            return Ok(());
        }

        // Walk away from the anchor regardless of how the batch was ordered.
        batch.sort_by(cmp_newest_first);
        if self.direction == Direction::Forward {
            batch.reverse();
        }
        let short = batch.len() < batch_size;
        let window = *collector.window();

        for record in &batch {
            if self.crossed_edge(record, &window) {
                debug!(
                    direction = ?self.direction,
                    boundary = %record.created_at,
                    "walk crossed window edge"
                );
                self.active = false;
                break;
            }
            if collector.offer(record) == Offer::Full || collector.is_full() {
                self.active = false;
                break;
            }
        }

        let frontier = match self.direction {
            Direction::Backward => batch.iter().map(RemoteRecord::id_value).min(),
            Direction::Forward => batch.iter().map(RemoteRecord::id_value).max(),
        };
        match frontier {
            Some(next) if self.advances_to(next) => self.cursor = next,
            _ => self.active = false,
        }
        if short {
            self.active = false;
        }
        Ok(())
    }

    fn crossed_edge(&self, record: &RemoteRecord, window: &TimeWindow) -> bool {
        match self.direction {
            Direction::Backward => record.created_at < window.start(),
            Direction::Forward => record.created_at > window.end(),
        }
    }

    fn advances_to(&self, next: u64) -> bool {
        match self.direction {
            Direction::Backward => next < self.cursor,
            Direction::Forward => next > self.cursor,
        }
    }
}

/// Collect every record of `window` reachable from `anchor`, up to `max`.
///
/// The anchor itself is part of the result only when it lies inside the
/// window.
pub async fn expand(
    store: &dyn RemoteStore,
    channel_id: &str,
    anchor: &Anchor,
    window: &TimeWindow,
    max: usize,
    batch_size: usize,
) -> Result<RetrievalResult, RetrievalError> {
    let batch_size = batch_size.clamp(1, MAX_BATCH);
    let mut collector = WindowCollector::new(*window, max);
    let origin = anchor.record();
    if anchor.is_in_window() {
        collector.offer(origin);
    }

    let mut backward = Walk::new(Direction::Backward, origin.id_value());
    let mut forward = Walk::new(Direction::Forward, origin.id_value());

    while (backward.active || forward.active) && !collector.is_full() {
        if backward.active {
            backward
                .step(store, channel_id, batch_size, &mut collector)
                .await?;
        }
        if forward.active && !collector.is_full() {
            forward
                .step(store, channel_id, batch_size, &mut collector)
                .await?;
        }
    }

    debug!(
        records = collector.len(),
        calls = collector.calls(),
        truncated = collector.is_full(),
        "expansion finished"
    );
    Ok(collector.finish(StrategyKind::AnchoredBidirectional))
}
