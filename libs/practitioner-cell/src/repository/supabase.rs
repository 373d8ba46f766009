use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_database::SupabaseClient;

use crate::models::{Practitioner, WorkingInterval};

use super::{sort_intervals, PractitionerRepo, RepositoryError, WorkingIntervalRepo};

const PRACTITIONER_COLUMNS: &str = "id,facility_id,name,specialty,slot_duration_minutes,created_at,updated_at";
const INTERVAL_COLUMNS: &str = "id,practitioner_id,day_of_week,start_local,end_local";

pub struct SupabasePractitionerRepo {
    supabase: Arc<SupabaseClient>,
}

impl SupabasePractitionerRepo {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

fn first<T>(rows: Vec<T>, what: &str) -> Result<T, RepositoryError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| RepositoryError::Backend(format!("{} write returned no rows", what)))
}

#[async_trait]
impl PractitionerRepo for SupabasePractitionerRepo {
    async fn get(&self, id: Uuid) -> Result<Option<Practitioner>, RepositoryError> {
        let path = format!("/rest/v1/practitioners?id=eq.{}&select={}", id, PRACTITIONER_COLUMNS);
        let rows: Vec<Practitioner> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Practitioner>, RepositoryError> {
        debug!("Listing practitioners for facility {}", facility_id);
        let path = format!(
            "/rest/v1/practitioners?facility_id=eq.{}&select={}&order=name.asc",
            facility_id, PRACTITIONER_COLUMNS
        );
        Ok(self.supabase.request(Method::GET, &path, None, None).await?)
    }

    async fn insert(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError> {
        let rows: Vec<Practitioner> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/practitioners",
                None,
                Some(json!(practitioner)),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        first(rows, "practitioner")
    }

    async fn update(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError> {
        let path = format!("/rest/v1/practitioners?id=eq.{}", practitioner.id);
        let body = json!({
            "name": practitioner.name,
            "specialty": practitioner.specialty,
            "slot_duration_minutes": practitioner.slot_duration_minutes,
            "updated_at": practitioner.updated_at,
        });
        let rows: Vec<Practitioner> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(body),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound(format!("practitioner {}", practitioner.id)))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let path = format!("/rest/v1/practitioners?id=eq.{}", id);
        let rows: Vec<Practitioner> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        if rows.is_empty() {
            return Err(RepositoryError::NotFound(format!("practitioner {}", id)));
        }
        Ok(())
    }
}

pub struct SupabaseWorkingIntervalRepo {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseWorkingIntervalRepo {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl WorkingIntervalRepo for SupabaseWorkingIntervalRepo {
    async fn for_weekday(&self, practitioner_id: Uuid, day_of_week: u8) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let path = format!(
            "/rest/v1/working_intervals?practitioner_id=eq.{}&day_of_week=eq.{}&select={}&order=start_local.asc",
            practitioner_id, day_of_week, INTERVAL_COLUMNS
        );
        let mut rows: Vec<WorkingInterval> = self.supabase.request(Method::GET, &path, None, None).await?;
        sort_intervals(&mut rows);
        Ok(rows)
    }

    async fn for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let path = format!(
            "/rest/v1/working_intervals?practitioner_id=eq.{}&select={}&order=day_of_week.asc,start_local.asc",
            practitioner_id, INTERVAL_COLUMNS
        );
        let mut rows: Vec<WorkingInterval> = self.supabase.request(Method::GET, &path, None, None).await?;
        sort_intervals(&mut rows);
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WorkingInterval>, RepositoryError> {
        let path = format!("/rest/v1/working_intervals?id=eq.{}&select={}", id, INTERVAL_COLUMNS);
        let rows: Vec<WorkingInterval> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError> {
        let rows: Vec<WorkingInterval> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/working_intervals",
                None,
                Some(json!(interval)),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        first(rows, "working interval")
    }

    async fn update(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError> {
        let path = format!("/rest/v1/working_intervals?id=eq.{}", interval.id);
        let rows: Vec<WorkingInterval> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                None,
                Some(json!(interval)),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| RepositoryError::NotFound(format!("working interval {}", interval.id)))
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let path = format!("/rest/v1/working_intervals?id=eq.{}", id);
        let rows: Vec<WorkingInterval> = self
            .supabase
            .request_with_headers(
                Method::DELETE,
                &path,
                None,
                None,
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        if rows.is_empty() {
            return Err(RepositoryError::NotFound(format!("working interval {}", id)));
        }
        Ok(())
    }

    async fn replace_all(
        &self,
        practitioner_id: Uuid,
        intervals: Vec<WorkingInterval>,
    ) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let path = format!("/rest/v1/working_intervals?practitioner_id=eq.{}", practitioner_id);
        let _: Vec<WorkingInterval> = self.supabase.request(Method::DELETE, &path, None, None).await?;

        if intervals.is_empty() {
            return Ok(intervals);
        }

        let mut rows: Vec<WorkingInterval> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/working_intervals",
                None,
                Some(json!(intervals)),
                Some(SupabaseClient::representation_headers()),
            )
            .await?;
        sort_intervals(&mut rows);
        Ok(rows)
    }
}
