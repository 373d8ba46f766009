use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Facility not found: {0}")]
    FacilityNotFound(Uuid),

    #[error("Subject not found: {0}")]
    SubjectNotFound(Uuid),

    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    #[error("Directory backend error: {0}")]
    Backend(String),
}
