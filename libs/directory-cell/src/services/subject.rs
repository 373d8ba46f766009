use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::SupabaseClient;

use crate::error::DirectoryError;
use crate::models::SubjectRecord;

/// Resolves a subject (patient) to its owning facility and contact reference.
#[async_trait]
pub trait SubjectDirectory: Send + Sync {
    async fn subject(&self, subject_id: Uuid) -> Result<SubjectRecord, DirectoryError>;
}

#[derive(Default)]
pub struct InMemorySubjectDirectory {
    subjects: RwLock<HashMap<Uuid, SubjectRecord>>,
}

impl InMemorySubjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert(&self, subject: SubjectRecord) -> SubjectRecord {
        self.subjects.write().await.insert(subject.id, subject.clone());
        subject
    }
}

#[async_trait]
impl SubjectDirectory for InMemorySubjectDirectory {
    async fn subject(&self, subject_id: Uuid) -> Result<SubjectRecord, DirectoryError> {
        self.subjects
            .read()
            .await
            .get(&subject_id)
            .cloned()
            .ok_or(DirectoryError::SubjectNotFound(subject_id))
    }
}

pub struct SupabaseSubjectDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseSubjectDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl SubjectDirectory for SupabaseSubjectDirectory {
    async fn subject(&self, subject_id: Uuid) -> Result<SubjectRecord, DirectoryError> {
        debug!("Resolving subject {}", subject_id);

        let path = format!(
            "/rest/v1/patients?id=eq.{}&select=id,facility_id,contact_ref,display_name",
            subject_id
        );
        let rows: Vec<SubjectRecord> = self.supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DirectoryError::Backend(e.to_string()))?;

        rows.into_iter()
            .next()
            .ok_or(DirectoryError::SubjectNotFound(subject_id))
    }
}
