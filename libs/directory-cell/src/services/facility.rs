use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::error::DirectoryError;
use crate::models::Facility;

pub fn parse_timezone(name: &str) -> Result<Tz, DirectoryError> {
    name.parse::<Tz>()
        .map_err(|_| DirectoryError::UnknownTimezone(name.to_string()))
}

/// Resolves `facilityId → timezone`.
#[async_trait]
pub trait FacilityDirectory: Send + Sync {
    async fn facility(&self, facility_id: Uuid) -> Result<Facility, DirectoryError>;

    /// Zone used for every local wall-clock interpretation in this facility.
    fn fallback_timezone(&self) -> &str;

    async fn timezone(&self, facility_id: Uuid) -> Result<Tz, DirectoryError> {
        let facility = self.facility(facility_id).await?;
        match facility.timezone.as_deref() {
            Some(name) if !name.trim().is_empty() => parse_timezone(name),
            _ => {
                warn!("Facility {} has no time zone, using {}", facility_id, self.fallback_timezone());
                parse_timezone(self.fallback_timezone())
            }
        }
    }
}

pub struct InMemoryFacilityDirectory {
    facilities: RwLock<HashMap<Uuid, Facility>>,
    fallback_timezone: String,
}

impl InMemoryFacilityDirectory {
    pub fn new(fallback_timezone: &str) -> Self {
        Self {
            facilities: RwLock::new(HashMap::new()),
            fallback_timezone: fallback_timezone.to_string(),
        }
    }

    pub async fn upsert(&self, facility: Facility) -> Result<Facility, DirectoryError> {
        if let Some(name) = facility.timezone.as_deref() {
            parse_timezone(name)?;
        }
        self.facilities.write().await.insert(facility.id, facility.clone());
        Ok(facility)
    }
}

#[async_trait]
impl FacilityDirectory for InMemoryFacilityDirectory {
    async fn facility(&self, facility_id: Uuid) -> Result<Facility, DirectoryError> {
        self.facilities
            .read()
            .await
            .get(&facility_id)
            .cloned()
            .ok_or(DirectoryError::FacilityNotFound(facility_id))
    }

    fn fallback_timezone(&self) -> &str {
        &self.fallback_timezone
    }
}

pub struct SupabaseFacilityDirectory {
    supabase: Arc<SupabaseClient>,
    fallback_timezone: String,
}

impl SupabaseFacilityDirectory {
    pub fn new(supabase: Arc<SupabaseClient>, fallback_timezone: &str) -> Self {
        Self {
            supabase,
            fallback_timezone: fallback_timezone.to_string(),
        }
    }
}

#[async_trait]
impl FacilityDirectory for SupabaseFacilityDirectory {
    async fn facility(&self, facility_id: Uuid) -> Result<Facility, DirectoryError> {
        debug!("Resolving facility {}", facility_id);

        let path = format!("/rest/v1/facilities?id=eq.{}&select=id,name,timezone", facility_id);
        let rows: Vec<Facility> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(DirectoryError::FacilityNotFound(facility_id))
    }

    fn fallback_timezone(&self) -> &str {
        &self.fallback_timezone
    }
}
