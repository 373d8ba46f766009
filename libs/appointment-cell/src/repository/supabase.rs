use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use practitioner_cell::{Interval, RepositoryError};
use shared_database::SupabaseClient;

use crate::models::Appointment;

use super::AppointmentRepo;

const COLUMNS: &str =
    "id,facility_id,practitioner_id,subject_id,start_at,end_at,status,version,created_at,updated_at";

/// PostgREST-backed store. Expects a partial unique index on
/// `(practitioner_id, start_at) where status <> 'cancelled'`.
pub struct SupabaseAppointmentRepo {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentRepo {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn select(&self, filter: &str) -> Result<Vec<Appointment>, RepositoryError> {
        let path = format!("/rest/v1/appointments?{}&select={}&order=start_at.asc", filter, COLUMNS);
        Ok(self.supabase.request(Method::GET, &path, None, None).await?)
    }
}

fn instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[async_trait]
impl AppointmentRepo for SupabaseAppointmentRepo {
    async fn get(&self, id: Uuid) -> Result<Option<Appointment>, RepositoryError> {
        Ok(self.select(&format!("id=eq.{}", id)).await?.into_iter().next())
    }

    async fn active_starting_in(
        &self,
        practitioner_id: Uuid,
        window: Interval,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        let mut filter = format!(
            "practitioner_id=eq.{}&status=neq.cancelled&start_at=gte.{}&start_at=lt.{}",
            practitioner_id,
            instant(window.start_at),
            instant(window.end_at),
        );
        if let Some(id) = exclude_id {
            filter.push_str(&format!("&id=neq.{}", id));
        }
        debug!("Loading booked appointments: {}", filter);
        self.select(&filter).await
    }

    async fn insert(&self, appointment: Appointment) -> Result<Appointment, RepositoryError> {
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                None,
                Some(json!(appointment)),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepositoryError::Backend("appointment insert returned no rows".to_string()))
    }

    async fn update(&self, appointment: Appointment, expected_version: i64) -> Result<Appointment, RepositoryError> {
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&version=eq.{}",
            appointment.id, expected_version
        );
        let body = json!({
            "practitioner_id": appointment.practitioner_id,
            "start_at": appointment.start_at,
            "end_at": appointment.end_at,
            "status": appointment.status,
            "version": expected_version + 1,
            "updated_at": appointment.updated_at,
        });
        let rows: Vec<Appointment> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        // Zero rows matched: someone else bumped the version first.
        rows.into_iter()
            .next()
            .ok_or(RepositoryError::VersionConflict(appointment.id))
    }

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Appointment>, RepositoryError> {
        self.select(&format!("facility_id=eq.{}", facility_id)).await
    }

    async fn list_by_subject(&self, subject_id: Uuid) -> Result<Vec<Appointment>, RepositoryError> {
        self.select(&format!("subject_id=eq.{}", subject_id)).await
    }

    async fn confirmed_starting_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, RepositoryError> {
        self.select(&format!(
            "status=eq.confirmed&start_at=gte.{}&start_at=lt.{}",
            instant(from),
            instant(to)
        ))
        .await
    }
}
