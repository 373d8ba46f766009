use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CalendarError;
use crate::interval::Interval;
use crate::local_time::local_instant;

pub const DEFAULT_SLOT_DURATION_MINUTES: i32 = 30;
pub const MIN_SLOT_DURATION_MINUTES: i32 = 5;

static HHMM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid HH:mm pattern")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub slot_duration_minutes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Practitioner {
    pub fn slot_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.slot_duration_minutes as i64)
    }
}

/// Recurring weekly open period, in the owning facility's wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingInterval {
    pub id: Uuid,
    pub practitioner_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_local: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_local: NaiveTime,
}

impl WorkingInterval {
    /// The absolute interval this row covers on `date`.
    ///
    /// `None` when a DST shift collapses the local bounds onto each other.
    pub fn on_date(&self, tz: &Tz, date: NaiveDate) -> Option<Interval> {
        Interval::new(
            local_instant(tz, date, self.start_local),
            local_instant(tz, date, self.end_local),
        )
    }

    pub fn overlaps_local(&self, other: &WorkingInterval) -> bool {
        self.day_of_week == other.day_of_week
            && self.start_local < other.end_local
            && other.start_local < self.end_local
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PractitionerProfile {
    #[serde(flatten)]
    pub practitioner: Practitioner,
    pub working_intervals: Vec<WorkingInterval>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkingIntervalInput {
    pub day_of_week: i32,
    pub start_time: String,
    pub end_time: String,
}

/// A working interval that passed validation but has no identity yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingHours {
    pub day_of_week: u8,
    pub start_local: NaiveTime,
    pub end_local: NaiveTime,
}

impl WorkingHours {
    pub fn into_interval(self, practitioner_id: Uuid) -> WorkingInterval {
        WorkingInterval {
            id: Uuid::new_v4(),
            practitioner_id,
            day_of_week: self.day_of_week,
            start_local: self.start_local,
            end_local: self.end_local,
        }
    }
}

impl WorkingIntervalInput {
    pub fn validate(&self) -> Result<WorkingHours, CalendarError> {
        let day_of_week = validate_day_of_week(self.day_of_week)?;
        let start_local = parse_hhmm(&self.start_time)?;
        let end_local = parse_hhmm(&self.end_time)?;
        ensure_ordered(start_local, end_local)?;
        Ok(WorkingHours { day_of_week, start_local, end_local })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePractitionerRequest {
    pub name: String,
    pub specialty: Option<String>,
    pub slot_duration_minutes: Option<i32>,
    pub working_intervals: Vec<WorkingIntervalInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePractitionerRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub slot_duration_minutes: Option<i32>,
    /// Replaces every existing working interval when present.
    pub working_intervals: Option<Vec<WorkingIntervalInput>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWorkingIntervalRequest {
    pub day_of_week: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

pub fn parse_hhmm(value: &str) -> Result<NaiveTime, CalendarError> {
    if !HHMM.is_match(value) {
        return Err(CalendarError::InvalidTimeFormat(value.to_string()));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| CalendarError::InvalidTimeFormat(value.to_string()))
}

pub fn validate_day_of_week(day: i32) -> Result<u8, CalendarError> {
    match day {
        0..=6 => Ok(day as u8),
        _ => Err(CalendarError::InvalidDayOfWeek(day)),
    }
}

pub fn validate_slot_duration(minutes: i32) -> Result<i32, CalendarError> {
    if minutes < MIN_SLOT_DURATION_MINUTES {
        return Err(CalendarError::InvalidSlotDuration(minutes));
    }
    Ok(minutes)
}

pub fn ensure_ordered(start: NaiveTime, end: NaiveTime) -> Result<(), CalendarError> {
    if start >= end {
        return Err(CalendarError::InvalidWorkingInterval {
            start: start.format("%H:%M").to_string(),
            end: end.format("%H:%M").to_string(),
        });
    }
    Ok(())
}

/// Serialises as `HH:mm`; accepts `HH:mm` or the `HH:mm:ss` form Postgres `time` columns return.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|_| de::Error::custom(format!("invalid time of day: {raw}")))
    }
}
