use crate::onedrive_service::onedrive_models::RemoteObject;
use chrono::{DateTime, Utc};

/// Content type reported for every file.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// What a filesystem consumer gets to see about an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub is_container: bool,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn content_type(&self) -> &'static str {
        DEFAULT_CONTENT_TYPE
    }
}

impl From<&RemoteObject> for Metadata {
    fn from(object: &RemoteObject) -> Self {
        Self {
            name: object.name.clone(),
            is_container: object.is_container,
            size: object.size,
            modified_at: object.modified_at,
        }
    }
}
