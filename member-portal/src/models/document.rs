use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document metadata. A row exists if and only if the object under
/// `storage_key` exists; the repository enforces that pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(name: String, description: Option<String>, storage_key: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            storage_key,
            created_at: Utc::now(),
        }
    }

    /// Original filename of the backing object, for download headers.
    ///
    /// Storage keys are `{unix_millis}_{sanitized_name}`.
    pub fn file_name(&self) -> &str {
        self.storage_key
            .split_once('_')
            .map(|(_, name)| name)
            .unwrap_or("download")
    }
}
