use serde::Deserialize;
use tracing::info;

use crate::error::DirectoryError;
use crate::models::{Facility, SubjectRecord};
use crate::services::{InMemoryFacilityDirectory, InMemorySubjectDirectory};

/// Contents of a `DIRECTORY_SEED_FILE` for the in-memory backend.
#[derive(Debug, Default, Deserialize)]
pub struct DirectorySeed {
    #[serde(default)]
    pub facilities: Vec<Facility>,
    #[serde(default)]
    pub subjects: Vec<SubjectRecord>,
}

impl DirectorySeed {
    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        serde_json::from_str(raw)
            .map_err(|e| DirectoryError::Backend(format!("invalid directory seed: {}", e)))
    }

    pub async fn load(path: &str) -> Result<Self, DirectoryError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DirectoryError::Backend(format!("cannot read {}: {}", path, e)))?;
        Self::from_json(&raw)
    }

    /// Subjects must reference a seeded facility; facility zones must parse.
    pub async fn apply(
        self,
        facilities: &InMemoryFacilityDirectory,
        subjects: &InMemorySubjectDirectory,
    ) -> Result<(), DirectoryError> {
        let facility_count = self.facilities.len();
        let known: Vec<_> = self.facilities.iter().map(|f| f.id).collect();

        for facility in self.facilities {
            facilities.upsert(facility).await?;
        }

        let subject_count = self.subjects.len();
        for subject in self.subjects {
            if !known.contains(&subject.facility_id) {
                return Err(DirectoryError::FacilityNotFound(subject.facility_id));
            }
            subjects.upsert(subject).await;
        }

        info!("Seeded directory with {} facilities and {} subjects", facility_count, subject_count);
        Ok(())
    }
}
