//! Conversions from facility-local wall-clock values to absolute instants.
//!
//! Weekdays are numbered 0 = Sunday .. 6 = Saturday regardless of locale.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::interval::Interval;

/// Longest DST gap we step across when a wall-clock time does not exist.
const MAX_GAP_MINUTES: i64 = 24 * 60;

pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Resolve a local wall-clock time to an instant.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times inside a
/// spring-forward gap move to the first local minute that exists.
pub fn resolve_local(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = local;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => match candidate.checked_add_signed(Duration::minutes(1)) {
                Some(next) => candidate = next,
                None => break,
            },
        }
    }
    // No zone has a day-long gap, and the calendar can run out; read the wall
    // clock as UTC.
    Utc.from_utc_datetime(&local)
}

pub fn local_instant(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(time))
}

/// `[local midnight, next local midnight)` for `date` in `tz`.
pub fn day_window(tz: &Tz, date: NaiveDate) -> Interval {
    let start_at = local_instant(tz, date, NaiveTime::MIN);
    let next = date.succ_opt().unwrap_or(NaiveDate::MAX);
    let end_at = local_instant(tz, next, NaiveTime::MIN);
    Interval { start_at, end_at }
}

/// Calendar date of an instant as seen in `tz`.
pub fn local_date(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America::New_York, Asia::Kuala_Lumpur, Europe::London};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        assert_eq!(weekday_index(date(2025, 10, 12)), 0);
        assert_eq!(weekday_index(date(2025, 10, 13)), 1);
        assert_eq!(weekday_index(date(2025, 10, 18)), 6);
    }

    #[test]
    fn fixed_offset_zone_converts_directly() {
        let instant = local_instant(&Kuala_Lumpur, date(2025, 10, 13), time(9, 0));
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 10, 13, 1, 0, 0).unwrap());
    }

    #[test]
    fn spring_forward_gap_moves_to_first_existing_minute() {
        // London skips 01:00-02:00 on 2025-03-30.
        let instant = local_instant(&London, date(2025, 3, 30), time(1, 30));
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 3, 30, 1, 0, 0).unwrap());
    }

    #[test]
    fn fall_back_ambiguity_takes_earliest() {
        // New York repeats 01:00-02:00 on 2025-11-02; first pass is EDT.
        let instant = local_instant(&New_York, date(2025, 11, 2), time(1, 30));
        assert_eq!(instant, Utc.with_ymd_and_hms(2025, 11, 2, 5, 30, 0).unwrap());
    }

    #[test]
    fn day_window_follows_dst_day_length() {
        assert_eq!(day_window(&London, date(2025, 3, 30)).duration(), Duration::hours(23));
        assert_eq!(day_window(&London, date(2025, 10, 26)).duration(), Duration::hours(25));
        assert_eq!(
            day_window(&Kuala_Lumpur, date(2025, 10, 13)).start_at,
            Utc.with_ymd_and_hms(2025, 10, 12, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn local_date_uses_zone_not_utc() {
        let instant = Utc.with_ymd_and_hms(2025, 10, 12, 20, 0, 0).unwrap();
        assert_eq!(local_date(&Kuala_Lumpur, instant), date(2025, 10, 13));
    }

    #[test]
    fn last_representable_day_does_not_overflow() {
        let window = day_window(&chrono_tz::UTC, NaiveDate::MAX);
        assert_eq!(window.start_at.date_naive(), NaiveDate::MAX);
        assert_eq!(
            local_instant(&chrono_tz::UTC, NaiveDate::MAX, time(23, 59)),
            Utc.from_utc_datetime(&NaiveDate::MAX.and_time(time(23, 59)))
        );
    }
}
