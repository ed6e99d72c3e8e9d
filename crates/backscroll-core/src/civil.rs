//! Civil-time conversion for a fixed-offset zone with the North American
//! daylight-saving rule.
//!
//! Daylight time runs from the second Sunday of March at 02:00 local
//! standard time to the first Sunday of November at 02:00 local daylight
//! time, and adds one hour to the standard offset. Local wall-clock times
//! are classified by the same rule, so the skipped spring hour maps as
//! daylight time and the repeated autumn hour resolves to its first
//! (daylight) occurrence.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use serde::Serialize;

/// A civil timezone: standard UTC offset plus an optional DST rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CivilZone {
    /// Standard-time offset from UTC in minutes (US Eastern: `-300`).
    pub utc_offset_minutes: i32,
    /// Whether the March–November daylight rule applies.
    pub daylight_saving: bool,
}

impl CivilZone {
    pub const UTC: CivilZone = CivilZone {
        utc_offset_minutes: 0,
        daylight_saving: false,
    };

    pub fn new(utc_offset_minutes: i32, daylight_saving: bool) -> Self {
        Self {
            utc_offset_minutes,
            daylight_saving,
        }
    }

    /// Whether `local` wall-clock time falls inside daylight time.
    pub fn is_daylight_saving(&self, local: NaiveDateTime) -> bool {
        self.daylight_saving && is_daylight_saving(local)
    }

    /// Offset in effect for a local wall-clock time.
    pub fn offset_at_local(&self, local: NaiveDateTime) -> Duration {
        let dst = if self.is_daylight_saving(local) { 60 } else { 0 };
        Duration::minutes(i64::from(self.utc_offset_minutes) + dst)
    }

    /// Offset in effect at a UTC instant.
    pub fn offset_at_utc(&self, utc: DateTime<Utc>) -> Duration {
        let standard = Duration::minutes(i64::from(self.utc_offset_minutes));
        if !self.daylight_saving {
            return standard;
        }
        let year = utc.year();
        let daylight = standard + Duration::hours(1);
        // Transitions happen at 02:00 local, expressed here in UTC.
        let begins = transition_at(year, 3, 2) - standard;
        let ends = transition_at(year, 11, 1) - daylight;
        let naive = utc.naive_utc();
        if naive >= begins && naive < ends {
            daylight
        } else {
            standard
        }
    }

    /// Local wall-clock time → UTC instant.
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - self.offset_at_local(local)))
    }

    /// UTC instant → local wall-clock time.
    pub fn from_utc(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.naive_utc() + self.offset_at_utc(utc)
    }

    /// Calendar date in this zone at a UTC instant.
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        self.from_utc(utc).date()
    }

    /// 00:00:00.000 local on `date`, as UTC.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc(date.and_time(NaiveTime::MIN))
    }

    /// 23:59:59.999 local on `date`, as UTC.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
        self.to_utc(date.and_time(last))
    }
}

impl Default for CivilZone {
    fn default() -> Self {
        Self::new(-300, true)
    }
}

/// Rule-only check on a local wall-clock time, independent of any offset.
pub fn is_daylight_saving(local: NaiveDateTime) -> bool {
    let year = local.year();
    local >= transition_at(year, 3, 2) && local < transition_at(year, 11, 1)
}

/// 02:00 on the `nth` Sunday of `month`.
fn transition_at(year: i32, month: u32, nth: u8) -> NaiveDateTime {
    let date = NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Sun, nth)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default());
    date.and_time(NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn iso(dt: DateTime<Utc>) -> String {
        dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }

    #[test]
    fn test_transition_dates_2024() {
        // 2024: DST from March 10 to November 3.
        assert!(!is_daylight_saving(local(2024, 3, 10, 1, 59)));
        assert!(is_daylight_saving(local(2024, 3, 10, 2, 0)));
        assert!(is_daylight_saving(local(2024, 11, 3, 1, 59)));
        assert!(!is_daylight_saving(local(2024, 11, 3, 2, 0)));
    }

    #[test]
    fn test_winter_and_summer() {
        assert!(!is_daylight_saving(local(2024, 1, 10, 12, 0)));
        assert!(is_daylight_saving(local(2024, 6, 1, 12, 0)));
        assert!(!is_daylight_saving(local(2024, 12, 25, 12, 0)));
    }

    #[test]
    fn test_eastern_day_bounds_in_winter() {
        let zone = CivilZone::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(iso(zone.start_of_day(date)), "2024-01-10T05:00:00.000Z");
        assert_eq!(iso(zone.end_of_day(date)), "2024-01-11T04:59:59.999Z");
    }

    #[test]
    fn test_eastern_day_bounds_in_summer() {
        let zone = CivilZone::default();
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(iso(zone.start_of_day(date)), "2024-06-01T04:00:00.000Z");
        assert_eq!(iso(zone.end_of_day(date)), "2024-06-02T03:59:59.999Z");
    }

    #[test]
    fn test_fall_back_day_is_25_hours() {
        let zone = CivilZone::default();
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        let start = zone.start_of_day(date);
        let end = zone.end_of_day(date);
        assert_eq!(iso(start), "2024-11-03T04:00:00.000Z");
        assert_eq!(iso(end), "2024-11-04T04:59:59.999Z");
        assert_eq!(end - start, Duration::hours(25) - Duration::milliseconds(1));
        // 01:30 happens twice; the first (daylight) occurrence wins.
        assert_eq!(
            iso(zone.to_utc(local(2024, 11, 3, 1, 30))),
            "2024-11-03T05:30:00.000Z"
        );
    }

    #[test]
    fn test_spring_forward_day_is_23_hours() {
        let zone = CivilZone::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let start = zone.start_of_day(date);
        let end = zone.end_of_day(date);
        assert_eq!(iso(start), "2024-03-10T05:00:00.000Z");
        assert_eq!(iso(end), "2024-03-11T03:59:59.999Z");
    }

    #[test]
    fn test_utc_round_trip_outside_transitions() {
        let zone = CivilZone::default();
        for l in [
            local(2024, 1, 10, 9, 30),
            local(2024, 6, 1, 9, 0),
            local(2024, 11, 3, 3, 0),
        ] {
            assert_eq!(zone.from_utc(zone.to_utc(l)), l);
        }
    }

    #[test]
    fn test_offset_at_utc_switches_at_transition_instant() {
        let zone = CivilZone::default();
        // 2024-03-10 02:00 EST == 07:00Z
        let before = Utc.with_ymd_and_hms(2024, 3, 10, 6, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 7, 0, 0).unwrap();
        assert_eq!(zone.offset_at_utc(before), Duration::hours(-5));
        assert_eq!(zone.offset_at_utc(after), Duration::hours(-4));
        // 2024-11-03 02:00 EDT == 06:00Z
        let before = Utc.with_ymd_and_hms(2024, 11, 3, 5, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 11, 3, 6, 0, 0).unwrap();
        assert_eq!(zone.offset_at_utc(before), Duration::hours(-4));
        assert_eq!(zone.offset_at_utc(after), Duration::hours(-5));
    }

    #[test]
    fn test_zone_without_dst_is_fixed() {
        let zone = CivilZone::new(-300, false);
        assert!(!zone.is_daylight_saving(local(2024, 6, 1, 12, 0)));
        assert_eq!(
            iso(zone.to_utc(local(2024, 6, 1, 0, 0))),
            "2024-06-01T05:00:00.000Z"
        );
    }

    #[test]
    fn test_local_date_near_midnight() {
        let zone = CivilZone::default();
        let utc = Utc.with_ymd_and_hms(2024, 1, 11, 3, 0, 0).unwrap();
        assert_eq!(zone.local_date(utc), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }
}
