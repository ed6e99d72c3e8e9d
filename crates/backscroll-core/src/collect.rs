//! Per-invocation accumulator shared by the expander and the linear walk.
//!
//! Holds the dedup set for a single retrieval (never process-wide), enforces
//! the record cap, and produces the final sorted [`RetrievalResult`].

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};

use crate::models::{cmp_chronological, RemoteRecord, RetrievalResult, StrategyKind, TimeWindow};

/// What happened to an offered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Accepted,
    Duplicate,
    Outside,
    /// The cap was already reached; nothing more is accepted.
    Full,
}

pub struct WindowCollector {
    window: TimeWindow,
    max: usize,
    seen: HashSet<String>,
    records: Vec<RemoteRecord>,
    truncated: bool,
    boundary: Option<DateTime<Utc>>,
    calls: usize,
    started: Instant,
}

impl WindowCollector {
    pub fn new(window: TimeWindow, max: usize) -> Self {
        Self {
            window,
            max,
            seen: HashSet::new(),
            records: Vec::new(),
            truncated: false,
            boundary: None,
            calls: 0,
            started: Instant::now(),
        }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn offer(&mut self, record: &RemoteRecord) -> Offer {
        if !self.window.contains(record.created_at) {
            return Offer::Outside;
        }
        if self.truncated || self.records.len() >= self.max {
            self.truncated = true;
            return Offer::Full;
        }
        if !self.seen.insert(record.id.clone()) {
            return Offer::Duplicate;
        }
        self.records.push(record.clone());
        if self.records.len() == self.max {
            self.truncated = true;
            self.boundary = Some(record.created_at);
        }
        Offer::Accepted
    }

    pub fn is_full(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_call(&mut self) {
        self.calls += 1;
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn finish(mut self, strategy: StrategyKind) -> RetrievalResult {
        self.records.sort_by(cmp_chronological);
        RetrievalResult {
            records: self.records,
            truncated: self.truncated,
            boundary_timestamp: self.boundary,
            call_count: self.calls,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::synthetic_record;
    use chrono::{Duration, TimeZone};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 23, 59, 59).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_dedup_and_outside() {
        let mut c = WindowCollector::new(window(), 10);
        let inside = synthetic_record(window().start() + Duration::hours(1), 0, "ada");
        let outside = synthetic_record(window().end() + Duration::hours(1), 0, "ada");
        assert_eq!(c.offer(&inside), Offer::Accepted);
        assert_eq!(c.offer(&inside), Offer::Duplicate);
        assert_eq!(c.offer(&outside), Offer::Outside);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_cap_marks_boundary_at_last_accepted() {
        let mut c = WindowCollector::new(window(), 2);
        let recs: Vec<_> = (0..3)
            .map(|i| synthetic_record(window().start() + Duration::hours(i), 0, "ada"))
            .collect();
        assert_eq!(c.offer(&recs[2]), Offer::Accepted);
        assert!(!c.is_full());
        assert_eq!(c.offer(&recs[0]), Offer::Accepted);
        assert!(c.is_full());
        assert_eq!(c.offer(&recs[1]), Offer::Full);
        let result = c.finish(StrategyKind::LinearBackward);
        assert!(result.truncated);
        assert_eq!(result.boundary_timestamp, Some(recs[0].created_at));
        assert_eq!(result.records.len(), 2);
        assert!(result.records[0].created_at < result.records[1].created_at);
    }

    #[test]
    fn test_zero_cap_accepts_nothing() {
        let mut c = WindowCollector::new(window(), 0);
        let inside = synthetic_record(window().start(), 0, "ada");
        assert_eq!(c.offer(&inside), Offer::Full);
        assert!(c.is_full());
        assert!(c.is_empty());
    }
}
