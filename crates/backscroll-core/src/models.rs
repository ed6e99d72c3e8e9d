//! Core data models shared by every retrieval stage.
//!
//! These types describe the time windows being queried, the records that
//! flow back from the remote store, their on-disk projection in the local
//! index, and the result handed to callers.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// An inclusive `[start, end]` interval in UTC, millisecond precision.
///
/// Construct with [`TimeWindow::new`], which rejects inverted bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Returns `None` when `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// Build a window from Unix millisecond bounds.
    pub fn from_millis(start_ms: i64, end_ms: i64) -> Option<Self> {
        let start = Utc.timestamp_millis_opt(start_ms).single()?;
        let end = Utc.timestamp_millis_opt(end_ms).single()?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn start_ms(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_ms(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Midpoint instant, rounded down to the millisecond.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }

    /// Widen symmetrically; the start saturates at the Unix epoch.
    pub fn widened(&self, by: chrono::Duration) -> Self {
        let floor = Utc.timestamp_millis_opt(0).single().unwrap_or(self.start);
        let start = self.start.checked_sub_signed(by).unwrap_or(floor).max(floor);
        let end = self.end.checked_add_signed(by).unwrap_or(self.end);
        Self { start, end }
    }

    /// Absolute distance from `ts` to the nearer edge (zero when inside).
    pub fn distance_to_edge(&self, ts: DateTime<Utc>) -> chrono::Duration {
        if self.contains(ts) {
            chrono::Duration::zero()
        } else if ts < self.start {
            self.start - ts
        } else {
            ts - self.end
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} .. {}]",
            self.start.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.end.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        )
    }
}

/// Author of a remote record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

/// A record as fetched from the remote store. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRecord {
    /// Snowflake ID, decimal string.
    pub id: String,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl RemoteRecord {
    /// Numeric form of the ID, used for cursor arithmetic and tie-breaking.
    /// Malformed IDs sort first.
    pub fn id_value(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

/// Newest-first by ID, the order the remote store returns batches in.
pub fn cmp_newest_first(a: &RemoteRecord, b: &RemoteRecord) -> Ordering {
    b.id_value().cmp(&a.id_value())
}

/// Ascending by creation time, ties broken by numeric ID.
pub fn cmp_chronological(a: &RemoteRecord, b: &RemoteRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id_value().cmp(&b.id_value()))
}

/// On-disk projection of a [`RemoteRecord`]: one JSON object per index line.
///
/// ```json
/// {"id":"1195...","author":{"id":"80...","username":"ada"},"content":"hi","createdTimestamp":1704862800000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub id: String,
    pub author: Author,
    pub content: String,
    #[serde(rename = "createdTimestamp")]
    pub created_timestamp: i64,
}

impl IndexedRecord {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.created_timestamp).single()
    }
}

impl From<&RemoteRecord> for IndexedRecord {
    fn from(r: &RemoteRecord) -> Self {
        Self {
            id: r.id.clone(),
            author: r.author.clone(),
            content: r.content.clone(),
            created_timestamp: r.created_at.timestamp_millis(),
        }
    }
}

impl TryFrom<IndexedRecord> for RemoteRecord {
    type Error = crate::error::CodecError;

    fn try_from(r: IndexedRecord) -> Result<Self, Self::Error> {
        let created_at = r
            .created_at()
            .ok_or(crate::error::CodecError::InvalidTimestamp(r.created_timestamp))?;
        Ok(Self {
            id: r.id,
            author: r.author,
            content: r.content,
            created_at,
        })
    }
}

/// Which path produced a [`RetrievalResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    LocalIndex,
    AnchoredBidirectional,
    LinearBackward,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StrategyKind::LocalIndex => "local-index",
            StrategyKind::AnchoredBidirectional => "anchored-bidirectional",
            StrategyKind::LinearBackward => "linear-backward",
        };
        f.write_str(s)
    }
}

/// Outcome of one retrieval.
///
/// `records` is sorted by [`cmp_chronological`] and never holds two entries
/// with the same ID. When `truncated` is set, `records.len()` equals the
/// configured maximum and `boundary_timestamp` is the creation time of the
/// last accepted record.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub records: Vec<RemoteRecord>,
    pub truncated: bool,
    pub boundary_timestamp: Option<DateTime<Utc>>,
    pub call_count: usize,
    pub elapsed_ms: u64,
    pub strategy: StrategyKind,
}

impl RetrievalResult {
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }
}
