//! Storage seam for practitioners and their weekly calendars.
//!
//! The slot generator and the calendar service only see these traits; the
//! backing store is chosen at wiring time.

mod memory;
mod supabase;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;

use crate::models::{Practitioner, WorkingInterval};

pub use memory::{InMemoryPractitionerRepo, InMemoryWorkingIntervalRepo};
pub use supabase::{SupabasePractitionerRepo, SupabaseWorkingIntervalRepo};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    #[error("{0} not found")]
    NotFound(String),

    /// Compare-and-set lost against a concurrent writer.
    #[error("Record {0} was modified concurrently")]
    VersionConflict(Uuid),

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for RepositoryError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SupabaseError>() {
            Some(SupabaseError::Conflict(msg)) => RepositoryError::UniqueViolation(msg.clone()),
            Some(SupabaseError::NotFound(msg)) => RepositoryError::NotFound(msg.clone()),
            _ => RepositoryError::Backend(err.to_string()),
        }
    }
}

#[async_trait]
pub trait PractitionerRepo: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Practitioner>, RepositoryError>;

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Practitioner>, RepositoryError>;

    async fn insert(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError>;

    async fn update(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait WorkingIntervalRepo: Send + Sync {
    /// Rows for one weekday, ordered by local start.
    async fn for_weekday(&self, practitioner_id: Uuid, day_of_week: u8) -> Result<Vec<WorkingInterval>, RepositoryError>;

    /// Every row, ordered by weekday then local start.
    async fn for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<WorkingInterval>, RepositoryError>;

    async fn get(&self, id: Uuid) -> Result<Option<WorkingInterval>, RepositoryError>;

    async fn insert(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError>;

    async fn update(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    async fn replace_all(
        &self,
        practitioner_id: Uuid,
        intervals: Vec<WorkingInterval>,
    ) -> Result<Vec<WorkingInterval>, RepositoryError>;
}

pub(crate) fn sort_intervals(intervals: &mut [WorkingInterval]) {
    intervals.sort_by_key(|wi| (wi.day_of_week, wi.start_local, wi.end_local));
}
