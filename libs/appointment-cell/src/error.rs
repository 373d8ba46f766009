use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use directory_cell::DirectoryError;
use practitioner_cell::RepositoryError;
use shared_models::error::AppError;

use crate::models::AppointmentStatus;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppointmentError {
    #[error("Appointment {0} not found")]
    NotFound(Uuid),

    #[error("Practitioner {0} not found")]
    PractitionerNotFound(Uuid),

    #[error("Subject {0} not found")]
    SubjectNotFound(Uuid),

    #[error("Facility {0} not found")]
    FacilityNotFound(Uuid),

    #[error("Slot {start_at} - {end_at} is not available for practitioner {practitioner_id}")]
    SlotUnavailable {
        practitioner_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    },

    #[error("Appointment {appointment_id} cannot move from {from} to {to}")]
    InvalidTransition {
        appointment_id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Appointment {appointment_id} has not ended yet (ends at {end_at})")]
    NotYetEnded {
        appointment_id: Uuid,
        end_at: DateTime<Utc>,
    },

    #[error("{entity} belongs to facility {found}, expected {expected}")]
    TenantMismatch {
        expected: Uuid,
        found: Uuid,
        entity: String,
    },

    #[error("Timed out after {waited_ms}ms waiting for the allocation lock of practitioner {practitioner_id}")]
    LockTimeout { practitioner_id: Uuid, waited_ms: u64 },

    #[error("Appointment {0} was modified concurrently")]
    ConcurrentModification(Uuid),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppointmentError {
    /// Transient faults the caller may retry with the same inputs.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AppointmentError::LockTimeout { .. } | AppointmentError::ConcurrentModification(_)
        )
    }
}

impl From<RepositoryError> for AppointmentError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict(id) => AppointmentError::ConcurrentModification(id),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<DirectoryError> for AppointmentError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::SubjectNotFound(id) => AppointmentError::SubjectNotFound(id),
            DirectoryError::FacilityNotFound(id) => AppointmentError::FacilityNotFound(id),
            DirectoryError::UnknownTimezone(name) => AppointmentError::UnknownTimezone(name),
            other => AppointmentError::DatabaseError(other.to_string()),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        let message = err.to_string();
        match err {
            AppointmentError::NotFound(_)
            | AppointmentError::PractitionerNotFound(_)
            | AppointmentError::SubjectNotFound(_)
            | AppointmentError::FacilityNotFound(_) => AppError::NotFound(message),
            AppointmentError::SlotUnavailable { .. }
            | AppointmentError::InvalidTransition { .. }
            | AppointmentError::NotYetEnded { .. } => AppError::Conflict(message),
            AppointmentError::TenantMismatch { .. } => AppError::Forbidden(message),
            AppointmentError::LockTimeout { .. } | AppointmentError::ConcurrentModification(_) => {
                AppError::Unavailable(message)
            }
            AppointmentError::InvalidTime(_) => AppError::ValidationError(message),
            AppointmentError::UnknownTimezone(_) => AppError::Internal(message),
            AppointmentError::DatabaseError(_) => AppError::Database(message),
        }
    }
}
