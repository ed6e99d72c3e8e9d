//! Range-token parsing.
//!
//! Free-form text may embed one `{A}` or `{A - B}` token, where each side is
//! a date literal or `Today` (any case). Civil days are resolved in a
//! [`CivilZone`] and the result is always an absolute UTC [`TimeWindow`].
//!
//! | Token | Window |
//! |-------|--------|
//! | `{2024-01-10}` | whole local day |
//! | `{Today}` | start of today .. `now` |
//! | `{01/10/2024 - 01/12/2024}` | start of Jan 10 .. end of Jan 12 |
//! | `{01/10/2024 - Today}` | start of Jan 10 .. `now` |
//! | `{Today - Today}` | start of today .. `now` |
//!
//! Literals are tried as ISO-style dates first, then `MM/DD/YYYY`, then
//! `DD/MM/YYYY` when the first field cannot be a month.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;

use crate::civil::CivilZone;
use crate::error::RangeError;
use crate::models::TimeWindow;

/// One side of a range token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLiteral {
    Today,
    Date(NaiveDate),
}

/// Parses range tokens against a fixed civil zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeParser {
    zone: CivilZone,
}

impl RangeParser {
    pub fn new(zone: CivilZone) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> CivilZone {
        self.zone
    }

    /// Find and resolve the first range token in `text`.
    ///
    /// Returns `None` when there is no token, a literal is not a date, or the
    /// window would be inverted. `now` is the evaluation instant.
    pub fn parse(&self, text: &str, now: DateTime<Utc>) -> Option<TimeWindow> {
        match self.try_parse(text, now) {
            Ok(window) => Some(window),
            Err(e) => {
                debug!(error = %e, "no time window in input");
                None
            }
        }
    }

    /// Like [`parse`](Self::parse), reporting why no window was produced.
    pub fn try_parse(&self, text: &str, now: DateTime<Utc>) -> Result<TimeWindow, RangeError> {
        let (left, right) = extract_token(text).ok_or(RangeError::MissingToken)?;
        let from = parse_date_literal(left, self.zone)
            .ok_or_else(|| RangeError::BadDate(left.to_string()))?;
        let to = match right {
            Some(r) => Some(
                parse_date_literal(r, self.zone)
                    .ok_or_else(|| RangeError::BadDate(r.to_string()))?,
            ),
            None => None,
        };

        let today = self.zone.local_date(now);
        let day_of = |lit: DateLiteral| match lit {
            DateLiteral::Today => today,
            DateLiteral::Date(d) => d,
        };

        let start = self.zone.start_of_day(day_of(from));
        let end = match (from, to) {
            (DateLiteral::Today, None) => now,
            (DateLiteral::Date(d), None) => self.zone.end_of_day(d),
            (_, Some(DateLiteral::Today)) => now,
            (_, Some(DateLiteral::Date(d))) => self.zone.end_of_day(d),
        };

        TimeWindow::new(start, end).ok_or(RangeError::Inverted)
    }
}

/// Locate the first `{...}` token and split it into its one or two operands.
pub fn extract_token(text: &str) -> Option<(&str, Option<&str>)> {
    let open = text.find('{')?;
    let close = open + text[open..].find('}')?;
    let inner = text[open + 1..close].trim();
    if inner.is_empty() {
        return None;
    }

    if let Some((l, r)) = split_spaced_dash(inner) {
        return Some((l, Some(r)));
    }

    // "01/10/2024-01/12/2024": a bare dash only splits when it cannot be
    // part of an ISO date.
    if !inner.contains(' ') && inner.matches('-').count() == 1 && inner.contains('/') {
        if let Some((l, r)) = inner.split_once('-') {
            let (l, r) = (l.trim(), r.trim());
            if !l.is_empty() && !r.is_empty() {
                return Some((l, Some(r)));
            }
        }
    }

    Some((inner, None))
}

/// Split on a `-` (or en dash) with whitespace on both sides.
fn split_spaced_dash(inner: &str) -> Option<(&str, &str)> {
    for (i, c) in inner.char_indices() {
        if c != '-' && c != '–' {
            continue;
        }
        let before = inner[..i].chars().next_back();
        let after = inner[i + c.len_utf8()..].chars().next();
        if before.is_some_and(char::is_whitespace) && after.is_some_and(char::is_whitespace) {
            let l = inner[..i].trim();
            let r = inner[i + c.len_utf8()..].trim();
            if !l.is_empty() && !r.is_empty() {
                return Some((l, r));
            }
        }
    }
    None
}

const ISO_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parse one operand. Instants with an explicit offset are mapped to their
/// calendar date in `zone`.
pub fn parse_date_literal(raw: &str, zone: CivilZone) -> Option<DateLiteral> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("today") {
        return Some(DateLiteral::Today);
    }
    parse_iso_like(s, zone)
        .or_else(|| parse_slashed(s))
        .map(DateLiteral::Date)
}

fn parse_iso_like(s: &str, zone: CivilZone) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(zone.local_date(dt.with_timezone(&Utc)));
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    ISO_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        // %Y happily reads "01" as year 1.
        .filter(|d| d.year_ce().1 >= 1000)
}

/// `MM/DD/YYYY`, or `DD/MM/YYYY` when the first field exceeds 12.
fn parse_slashed(s: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split('/').map(str::trim).collect();
    let [a, b, y] = parts.as_slice() else {
        return None;
    };
    if y.len() != 4 {
        return None;
    }
    let a: u32 = a.parse().ok()?;
    let b: u32 = b.parse().ok()?;
    let y: i32 = y.parse().ok()?;
    if a > 12 {
        NaiveDate::from_ymd_opt(y, b, a)
    } else {
        NaiveDate::from_ymd_opt(y, a, b)
    }
}
