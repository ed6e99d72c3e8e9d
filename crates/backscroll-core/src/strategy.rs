//! Remote fetch strategies behind one interface.
//!
//! The orchestrator tries strategies in a fixed order and falls back on the
//! first failure:
//!
//! | Strategy | Remote primitives | Cost |
//! |----------|-------------------|------|
//! | [`AnchoredStrategy`] | `around`, then `before` + `after` | proportional to the window |
//! | [`LinearStrategy`] | `before` only | proportional to the distance from the newest record |

use async_trait::async_trait;
use chrono::Duration;
use tracing::info;

use crate::anchor::AnchorSearch;
use crate::error::RetrievalError;
use crate::expand::expand;
use crate::linear::linear_fetch;
use crate::models::{RetrievalResult, StrategyKind, TimeWindow};
use crate::store::RemoteStore;

/// One way of pulling a window of records from the remote store.
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch(
        &self,
        store: &dyn RemoteStore,
        channel_id: &str,
        window: &TimeWindow,
        max: usize,
    ) -> Result<RetrievalResult, RetrievalError>;
}

/// Anchor search followed by bidirectional expansion.
pub struct AnchoredStrategy {
    pub search: AnchorSearch,
    pub batch_size: usize,
}

impl AnchoredStrategy {
    pub fn new(anchor_batch_size: usize, retries: u32, widen: Duration, batch_size: usize) -> Self {
        Self {
            search: AnchorSearch {
                batch_size: anchor_batch_size,
                retries,
                widen,
            },
            batch_size,
        }
    }
}

#[async_trait]
impl FetchStrategy for AnchoredStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::AnchoredBidirectional
    }

    async fn fetch(
        &self,
        store: &dyn RemoteStore,
        channel_id: &str,
        window: &TimeWindow,
        max: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        let outcome = self.search.locate(store, channel_id, window).await?;
        let anchor = outcome
            .anchor
            .ok_or_else(|| RetrievalError::AnchorNotFound(window.to_string()))?;
        info!(
            id = %anchor.record().id,
            in_window = anchor.is_in_window(),
            "anchor located"
        );
        let mut result = expand(store, channel_id, &anchor, window, max, self.batch_size).await?;
        result.call_count += outcome.calls;
        Ok(result)
    }
}

/// Linear backward walk from the newest record.
pub struct LinearStrategy {
    pub batch_size: usize,
}

#[async_trait]
impl FetchStrategy for LinearStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LinearBackward
    }

    async fn fetch(
        &self,
        store: &dyn RemoteStore,
        channel_id: &str,
        window: &TimeWindow,
        max: usize,
    ) -> Result<RetrievalResult, RetrievalError> {
        linear_fetch(store, channel_id, window, max, self.batch_size).await
    }
}
