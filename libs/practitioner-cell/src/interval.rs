use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Half-open interval `[start_at, end_at)` on the absolute (UTC) time line.
///
/// Every equality or overlap check in the scheduler goes through this type, so
/// local wall-clock values must be converted with [`crate::local_time`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

impl Interval {
    /// Returns `None` unless `start_at < end_at`.
    pub fn new(start_at: DateTime<Utc>, end_at: DateTime<Utc>) -> Option<Self> {
        (start_at < end_at).then_some(Self { start_at, end_at })
    }

    /// `None` also when the end would fall past the representable range.
    pub fn starting_at(start_at: DateTime<Utc>, length: Duration) -> Option<Self> {
        let end_at = start_at.checked_add_signed(length)?;
        Self::new(start_at, end_at)
    }

    /// Touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start_at < other.end_at && other.start_at < self.end_at
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start_at <= instant && instant < self.end_at
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.start_at <= other.start_at && other.end_at <= self.end_at
    }

    pub fn duration(&self) -> Duration {
        self.end_at - self.start_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 13, h, m, 0).unwrap()
    }

    fn iv(sh: u32, sm: u32, eh: u32, em: u32) -> Interval {
        Interval::new(at(sh, sm), at(eh, em)).unwrap()
    }

    #[test]
    fn rejects_empty_and_inverted() {
        assert!(Interval::new(at(9, 0), at(9, 0)).is_none());
        assert!(Interval::new(at(10, 0), at(9, 0)).is_none());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        assert!(!iv(9, 0, 9, 30).overlaps(&iv(9, 30, 10, 0)));
        assert!(!iv(9, 30, 10, 0).overlaps(&iv(9, 0, 9, 30)));
    }

    #[test]
    fn partial_and_nested_overlap() {
        assert!(iv(9, 0, 10, 0).overlaps(&iv(9, 45, 10, 15)));
        assert!(iv(9, 0, 12, 0).overlaps(&iv(10, 0, 10, 30)));
        assert!(iv(10, 0, 10, 30).overlaps(&iv(9, 0, 12, 0)));
        assert!(iv(9, 0, 12, 0).contains(&iv(10, 0, 10, 30)));
        assert!(iv(9, 0, 12, 0).contains_instant(at(9, 0)));
        assert!(!iv(9, 0, 12, 0).contains_instant(at(12, 0)));
    }

    #[test]
    fn equality_is_exact_on_both_bounds() {
        assert_eq!(iv(9, 0, 9, 30), iv(9, 0, 9, 30));
        assert_ne!(iv(9, 0, 9, 30), iv(9, 0, 9, 31));
        assert_eq!(iv(9, 0, 9, 30).duration(), Duration::minutes(30));
    }

    #[test]
    fn starting_at_the_end_of_time_has_no_interval() {
        let last = Utc.from_utc_datetime(&chrono::NaiveDate::MAX.and_hms_opt(23, 30, 0).unwrap());
        assert!(Interval::starting_at(last, Duration::minutes(30)).is_none());
        assert!(Interval::starting_at(last, Duration::minutes(29)).is_some());
    }
}
