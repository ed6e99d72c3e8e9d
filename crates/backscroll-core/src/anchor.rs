//! Anchor search: jump near a window before walking it.
//!
//! The window midpoint is encoded as a snowflake and handed to the remote
//! `around` primitive, which returns records clustered near that ID. Any
//! returned record inside the window is an in-window anchor. Failing that,
//! the search widens the acceptance window a step at a time and finally
//! settles for the returned record nearest to either window edge, which is
//! still a valid starting cursor for the expander.
//!
//! Each attempt costs at most one remote call; a non-empty batch is reused
//! across widening steps rather than fetched again.

use chrono::Duration;
use tracing::debug;

use crate::error::RetrievalError;
use crate::models::{RemoteRecord, TimeWindow};
use crate::snowflake;
use crate::store::RemoteStore;

/// Where expansion should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Inside the target window; seeds the result.
    InWindow(RemoteRecord),
    /// Outside the window; used only as a cursor.
    Navigational(RemoteRecord),
}

impl Anchor {
    pub fn record(&self) -> &RemoteRecord {
        match self {
            Anchor::InWindow(r) | Anchor::Navigational(r) => r,
        }
    }

    pub fn is_in_window(&self) -> bool {
        matches!(self, Anchor::InWindow(_))
    }
}

/// Result of [`AnchorSearch::locate`].
#[derive(Debug, Clone)]
pub struct AnchorOutcome {
    pub anchor: Option<Anchor>,
    pub calls: usize,
}

/// Tunables for anchor search.
#[derive(Debug, Clone, Copy)]
pub struct AnchorSearch {
    /// `limit` for each `around` call.
    pub batch_size: usize,
    /// Widening attempts after the first probe.
    pub retries: u32,
    /// Widening step, applied to each side per attempt.
    pub widen: Duration,
}

impl Default for AnchorSearch {
    fn default() -> Self {
        Self {
            batch_size: 100,
            retries: 2,
            widen: Duration::days(1),
        }
    }
}

/// One probe: fetch around the window midpoint and return the first
/// in-window record, if any. Batch order does not matter.
pub async fn find_anchor(
    store: &dyn RemoteStore,
    channel_id: &str,
    window: &TimeWindow,
    batch_size: usize,
) -> Result<Option<RemoteRecord>, RetrievalError> {
    let batch = probe(store, channel_id, window, batch_size).await?;
    Ok(batch.into_iter().find(|r| window.contains(r.created_at)))
}

async fn probe(
    store: &dyn RemoteStore,
    channel_id: &str,
    window: &TimeWindow,
    batch_size: usize,
) -> Result<Vec<RemoteRecord>, RetrievalError> {
    let mid = snowflake::to_id_string(window.midpoint())?;
    store
        .fetch_around(channel_id, &mid, batch_size)
        .await
        .map_err(RetrievalError::remote)
}

impl AnchorSearch {
    /// Probe with retries. `anchor` is `None` only when every probe came
    /// back empty.
    pub async fn locate(
        &self,
        store: &dyn RemoteStore,
        channel_id: &str,
        window: &TimeWindow,
    ) -> Result<AnchorOutcome, RetrievalError> {
        let mut batch: Vec<RemoteRecord> = Vec::new();
        let mut calls = 0;

        for attempt in 0..=self.retries {
            if batch.is_empty() {
                batch = probe(store, channel_id, window, self.batch_size).await?;
                calls += 1;
            }

            if let Some(r) = batch.iter().find(|r| window.contains(r.created_at)) {
                debug!(attempt, id = %r.id, "in-window anchor");
                return Ok(AnchorOutcome {
                    anchor: Some(Anchor::InWindow(r.clone())),
                    calls,
                });
            }

            if attempt > 0 {
                let scope = window.widened(self.widen * attempt as i32);
                let near = batch
                    .iter()
                    .filter(|r| scope.contains(r.created_at))
                    .min_by_key(|r| window.distance_to_edge(r.created_at));
                if let Some(r) = near {
                    debug!(attempt, id = %r.id, "navigational anchor in widened window");
                    return Ok(AnchorOutcome {
                        anchor: Some(Anchor::Navigational(r.clone())),
                        calls,
                    });
                }
            }
        }

        let nearest = batch
            .into_iter()
            .min_by_key(|r| window.distance_to_edge(r.created_at))
            .map(Anchor::Navigational);
        debug!(found = nearest.is_some(), calls, "anchor search exhausted");
        Ok(AnchorOutcome {
            anchor: nearest,
            calls,
        })
    }
}
