mod memory;
mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use practitioner_cell::{Interval, RepositoryError};

use crate::models::Appointment;

pub use memory::InMemoryAppointmentRepo;
pub use supabase::SupabaseAppointmentRepo;

#[async_trait]
pub trait AppointmentRepo: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError>;

    /// Non-cancelled appointments of one practitioner whose start falls in `window`.
    async fn active_starting_in(
        &self,
        practitioner_id: Uuid,
        window: Interval,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, RepositoryError>;

    /// Fails with `UniqueViolation` when a non-cancelled appointment of the same
    /// practitioner already starts at the same instant.
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError>;

    /// Stores `appointment` only if the stored row still carries
    /// `expected_version`; the stored copy gets `expected_version + 1`.
    async fn update(&self, appointment: Appointment, expected_version: i64) -> Result<Appointment, RepositoryError>;

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Appointment>, RepositoryError>;

    async fn list_by_subject(&self, subject_id: Uuid) -> Result<Vec<Appointment>, RepositoryError>;

    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, RepositoryError>;
}
