use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// Well-known identifier of the drive root item.
pub const ROOT_ID: &str = "root";

/// ParentReference: Represents the parent reference of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ParentReference {
    #[serde(default)]
    pub id: String,
    pub path: Option<String>,
}

/// DriveItem: Represents a drive item as returned by Microsoft Graph.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DriveItem {
    #[serde(default)]
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "eTag")]
    pub etag: Option<String>,
    #[serde(rename = "lastModifiedDateTime")]
    pub last_modified: Option<String>,
    #[serde(rename = "createdDateTime")]
    pub created_date: Option<String>,
    pub size: Option<u64>,
    pub folder: Option<FolderFacet>,
    pub file: Option<FileFacet>,
    pub deleted: Option<DeletedFacet>,
    #[serde(rename = "parentReference")]
    pub parent_reference: Option<ParentReference>,
}

/// FolderFacet: Represents the folder facet of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FolderFacet {
    #[serde(rename = "childCount", default)]
    pub child_count: u32,
}

/// FileFacet: Represents the file facet of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FileFacet {
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// DeletedFacet: Represents the deleted facet of a drive item.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeletedFacet {
    pub state: String, // Usually "deleted"
}

/// DriveItemCollection: one page of a children listing.
#[derive(Debug, Deserialize, Serialize)]
pub struct DriveItemCollection {
    #[serde(default)]
    pub value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// Upload session response from Microsoft Graph API
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadSessionResponse {
    #[serde(rename = "uploadUrl")]
    pub upload_url: String,
    #[serde(rename = "expirationDateTime")]
    pub expiration_date_time: Option<String>,
}

/// Upload session request body
#[derive(Debug, Serialize)]
pub struct UploadSessionRequest {
    pub item: UploadSessionItem,
}

/// Upload session item properties
#[derive(Debug, Serialize)]
pub struct UploadSessionItem {
    #[serde(rename = "@microsoft.graph.conflictBehavior")]
    pub conflict_behavior: String,
    pub name: String,
}

/// Represents a file chunk for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    pub start: u64,
    pub end: u64,
}

/// Store-agnostic view of one remote item.
///
/// Only the first entry of `parent_ids` is ever used as the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: String,
    pub name: String,
    pub is_container: bool,
    pub parent_ids: Vec<String>,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub trashed: bool,
}

impl RemoteObject {
    /// The drive root, known without asking the store.
    pub fn root() -> Self {
        Self {
            id: ROOT_ID.to_string(),
            name: String::new(),
            is_container: true,
            parent_ids: Vec::new(),
            size: 0,
            modified_at: None,
            trashed: false,
        }
    }

    pub fn effective_parent(&self) -> Option<&str> {
        self.parent_ids.first().map(String::as_str)
    }
}

impl From<DriveItem> for RemoteObject {
    fn from(item: DriveItem) -> Self {
        let modified_at = item
            .last_modified
            .as_deref()
            .or(item.created_date.as_deref())
            .and_then(|raw| match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(e) => {
                    warn!("Unparsable timestamp '{}' on item {}: {}", raw, item.id, e);
                    None
                }
            });

        Self {
            name: item.name.unwrap_or_default(),
            is_container: item.folder.is_some(),
            parent_ids: item
                .parent_reference
                .map(|p| p.id)
                .filter(|id| !id.is_empty())
                .into_iter()
                .collect(),
            size: item.size.unwrap_or(0),
            modified_at,
            trashed: item.deleted.is_some(),
            id: item.id,
        }
    }
}
