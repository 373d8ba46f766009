use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::repository::RepositoryError;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("Practitioner {0} not found")]
    PractitionerNotFound(Uuid),

    #[error("Working interval {0} not found")]
    WorkingIntervalNotFound(Uuid),

    #[error("Invalid time format '{0}', expected HH:mm")]
    InvalidTimeFormat(String),

    #[error("Working interval start {start} must be before end {end}")]
    InvalidWorkingInterval { start: String, end: String },

    #[error("Day of week {0} is outside 0..=6")]
    InvalidDayOfWeek(i32),

    #[error("Slot duration {0} is below the 5 minute minimum")]
    InvalidSlotDuration(i32),

    #[error("At least one working interval is required")]
    MissingWorkingIntervals,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<CalendarError> for AppError {
    fn from(err: CalendarError) -> Self {
        match err {
            CalendarError::PractitionerNotFound(_) | CalendarError::WorkingIntervalNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            CalendarError::Repository(RepositoryError::NotFound(msg)) => AppError::NotFound(msg),
            CalendarError::Repository(RepositoryError::VersionConflict(id)) => {
                AppError::Unavailable(format!("Record {} was modified concurrently", id))
            }
            CalendarError::Repository(RepositoryError::UniqueViolation(msg)) => AppError::Conflict(msg),
            CalendarError::Repository(RepositoryError::Backend(msg)) => AppError::Database(msg),
            _ => AppError::ValidationError(err.to_string()),
        }
    }
}
