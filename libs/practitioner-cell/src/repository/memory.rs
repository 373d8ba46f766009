use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Practitioner, WorkingInterval};

use super::{sort_intervals, PractitionerRepo, RepositoryError, WorkingIntervalRepo};

#[derive(Default)]
pub struct InMemoryPractitionerRepo {
    rows: RwLock<HashMap<Uuid, Practitioner>>,
}

impl InMemoryPractitionerRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PractitionerRepo for InMemoryPractitionerRepo {
    async fn get(&self, id: Uuid) -> Result<Option<Practitioner>, RepositoryError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_by_facility(&self, facility_id: Uuid) -> Result<Vec<Practitioner>, RepositoryError> {
        let mut found: Vec<Practitioner> = self
            .rows
            .read()
            .await
            .values()
            .filter(|p| p.facility_id == facility_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn insert(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&practitioner.id) {
            return Err(RepositoryError::UniqueViolation(format!("practitioner {}", practitioner.id)));
        }
        rows.insert(practitioner.id, practitioner.clone());
        Ok(practitioner)
    }

    async fn update(&self, practitioner: Practitioner) -> Result<Practitioner, RepositoryError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&practitioner.id) {
            Some(row) => {
                *row = practitioner.clone();
                Ok(practitioner)
            }
            None => Err(RepositoryError::NotFound(format!("practitioner {}", practitioner.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("practitioner {}", id)))
    }
}

#[derive(Default)]
pub struct InMemoryWorkingIntervalRepo {
    rows: RwLock<HashMap<Uuid, WorkingInterval>>,
}

impl InMemoryWorkingIntervalRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkingIntervalRepo for InMemoryWorkingIntervalRepo {
    async fn for_weekday(&self, practitioner_id: Uuid, day_of_week: u8) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let mut found: Vec<WorkingInterval> = self
            .rows
            .read()
            .await
            .values()
            .filter(|wi| wi.practitioner_id == practitioner_id && wi.day_of_week == day_of_week)
            .cloned()
            .collect();
        sort_intervals(&mut found);
        Ok(found)
    }

    async fn for_practitioner(&self, practitioner_id: Uuid) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let mut found: Vec<WorkingInterval> = self
            .rows
            .read()
            .await
            .values()
            .filter(|wi| wi.practitioner_id == practitioner_id)
            .cloned()
            .collect();
        sort_intervals(&mut found);
        Ok(found)
    }

    async fn get(&self, id: Uuid) -> Result<Option<WorkingInterval>, RepositoryError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn insert(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError> {
        self.rows.write().await.insert(interval.id, interval.clone());
        Ok(interval)
    }

    async fn update(&self, interval: WorkingInterval) -> Result<WorkingInterval, RepositoryError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&interval.id) {
            Some(row) => {
                *row = interval.clone();
                Ok(interval)
            }
            None => Err(RepositoryError::NotFound(format!("working interval {}", interval.id))),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("working interval {}", id)))
    }

    async fn replace_all(
        &self,
        practitioner_id: Uuid,
        intervals: Vec<WorkingInterval>,
    ) -> Result<Vec<WorkingInterval>, RepositoryError> {
        let mut rows = self.rows.write().await;
        rows.retain(|_, wi| wi.practitioner_id != practitioner_id);
        for interval in &intervals {
            rows.insert(interval.id, interval.clone());
        }
        let mut stored = intervals;
        sort_intervals(&mut stored);
        Ok(stored)
    }
}
