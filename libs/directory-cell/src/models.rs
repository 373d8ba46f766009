use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tenancy boundary. `timezone` is an IANA zone name such as `Asia/Kuala_Lumpur`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// The party that books time. `contact_ref` is opaque to the scheduler and is
/// handed to the notification sink unchanged (usually an email address).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: Uuid,
    pub facility_id: Uuid,
    pub contact_ref: String,
    #[serde(default)]
    pub display_name: Option<String>,
}
