use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use practitioner_cell::{Interval, RepositoryError};

use crate::models::{Appointment, AppointmentStatus};

use super::AppointmentRepo;

#[derive(Default)]
pub struct InMemoryAppointmentRepo {
    rows: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    async fn matching<F>(&self, keep: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut found: Vec<Appointment> = self.rows.read().await.values().filter(|a| keep(a)).cloned().collect();
        found.sort_by_key(|a| (a.start_at, a.id));
        found
    }
}

#[async_trait]
impl AppointmentRepo for InMemoryAppointmentRepo {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn active_starting_in(
        &self,
        practitioner_id: Uuid,
        window: Interval,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(self
            .matching(|a| {
                a.practitioner_id == practitioner_id
                    && a.status != AppointmentStatus::Cancelled
                    && window.contains_instant(a.start_at)
                    && Some(a.id) != exclude_id
            })
            .await)
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError> {
        let mut rows = self.rows.write().await;
        let taken = rows.values().any(|a| {
            a.practitioner_id == appointment.practitioner_id
                && a.status != AppointmentStatus::Cancelled
                && a.start_at == appointment.start_at
        });
        if taken || rows.contains_key(&appointment.id) {
            return Err(RepositoryError::UniqueViolation(format!(
                "appointment for practitioner {} at {}",
                appointment.practitioner_id, appointment.start_at
            )));
        }
        rows.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment, expected_version: i64) -> Result<Appointment, RepositoryError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .get_mut(&appointment.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("appointment {}", appointment.id)))?;
        if row.version != expected_version {
            return Err(RepositoryError::VersionConflict(appointment.id));
        }
        *row = Appointment { version: expected_version + 1, ..appointment };
        Ok(row.clone())
    }

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(self.matching(|a| a.facility_id == facility_id).await)
    }

    async fn list_by_subject(&self, subject_id: Uuid) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(self.matching(|a| a.subject_id == subject_id).await)
    }

    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        Ok(self
            .matching(|a| a.status == AppointmentStatus::Confirmed && from <= a.start_at && a.start_at < to)
            .await)
    }
}
