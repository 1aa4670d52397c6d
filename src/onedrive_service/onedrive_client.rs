use crate::auth::AuthProvider;
use crate::config::FsConfig;
use crate::onedrive_service::http_client::HttpClient;
use crate::onedrive_service::onedrive_models::{
    DriveItem, DriveItemCollection, FileChunk, RemoteObject, UploadSessionItem,
    UploadSessionRequest, UploadSessionResponse,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::{debug, info};
use std::pin::Pin;
use std::sync::Arc;
use urlencoding::encode;

/// Page size requested when listing children
const CHILDREN_PAGE_SIZE: u32 = 200;

/// Byte stream of a download, chunk by chunk.
pub type DownloadStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Filter for a children query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildQuery {
    pub name: Option<String>,
    pub containers_only: bool,
}

impl ChildQuery {
    /// Every child of the parent
    pub fn all() -> Self {
        Self::default()
    }

    /// Children with exactly this name
    pub fn named(name: &str, containers_only: bool) -> Self {
        Self {
            name: Some(name.to_string()),
            containers_only,
        }
    }

    /// Whether `object` passes the filter. Names compare case-insensitively,
    /// as OneDrive does.
    pub fn matches(&self, object: &RemoteObject) -> bool {
        if self.containers_only && !object.is_container {
            return false;
        }
        match &self.name {
            Some(name) => names_equal(&object.name, name),
            None => true,
        }
    }
}

fn names_equal(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// The flat, ID-addressed object store the filesystem is layered on.
///
/// Implementations return trashed objects as they are; filtering them out is
/// left to the caller.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<RemoteObject>;

    async fn list_children(&self, parent_id: &str, query: &ChildQuery) -> Result<Vec<RemoteObject>>;

    async fn create_object(
        &self,
        parent_id: &str,
        name: &str,
        is_container: bool,
        content: Option<Vec<u8>>,
    ) -> Result<RemoteObject>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn open_download_stream(&self, id: &str) -> Result<DownloadStream>;
}

/// OneDrive API client implementing [`RemoteStore`] on Microsoft Graph
#[derive(Clone)]
pub struct OneDriveClient {
    http_client: HttpClient,
    auth: Arc<dyn AuthProvider>,
    large_upload_threshold: u64,
    chunk_size: u64,
}

impl OneDriveClient {
    pub fn new(auth: Arc<dyn AuthProvider>, api_base: &str, config: &FsConfig) -> Self {
        Self {
            http_client: HttpClient::with_base(api_base),
            auth,
            large_upload_threshold: config.large_upload_threshold,
            chunk_size: config.aligned_chunk_size(),
        }
    }

    async fn auth_header(&self) -> Result<String> {
        self.auth
            .auth_header()
            .await
            .context("Failed to get auth header")
    }

    /// Get item by OneDrive ID
    pub async fn get_item_by_id(&self, item_id: &str) -> Result<DriveItem> {
        let auth_header = self.auth_header().await?;
        let url = format!("/me/drive/items/{}", encode(item_id));

        self.http_client
            .get(&url, &auth_header)
            .await
            .context("Failed to get item by ID")
    }

    /// Fetch every page of a folder's children
    pub async fn get_children(&self, parent_id: &str) -> Result<Vec<DriveItem>> {
        let auth_header = self.auth_header().await?;
        let mut url = format!(
            "/me/drive/items/{}/children?$top={}",
            encode(parent_id),
            CHILDREN_PAGE_SIZE
        );
        let mut items = Vec::new();

        loop {
            let page: DriveItemCollection = self
                .http_client
                .get(&url, &auth_header)
                .await
                .context("Failed to list children")?;
            items.extend(page.value);
            match page.next_link {
                Some(next_link) => url = next_link,
                None => break,
            }
        }

        debug!("Listed {} children of {}", items.len(), parent_id);
        Ok(items)
    }

    /// Look up one child by name with a path-relative request
    pub async fn get_child_by_name(&self, parent_id: &str, name: &str) -> Result<Option<DriveItem>> {
        let auth_header = self.auth_header().await?;
        let url = child_by_name_url(parent_id, name);

        self.http_client
            .get_optional(&url, &auth_header)
            .await
            .context("Failed to get child by name")
    }

    /// Create a folder under the given parent, failing on a name conflict
    pub async fn create_folder(&self, parent_id: &str, folder_name: &str) -> Result<DriveItem> {
        let auth_header = self.auth_header().await?;
        let url = format!("/me/drive/items/{}/children", encode(parent_id));
        let body = serde_json::json!({
            "name": folder_name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail"
        });

        let item: DriveItem = self
            .http_client
            .post(&url, &body, &auth_header)
            .await
            .context("Failed to create folder")?;

        info!("Created folder: {} in parent {} -> {}", folder_name, parent_id, item.id);
        Ok(item)
    }

    /// Upload new content, choosing simple or resumable upload by size
    pub async fn upload_file_smart(
        &self,
        file_data: Vec<u8>,
        file_name: &str,
        parent_id: &str,
    ) -> Result<DriveItem> {
        if file_data.len() as u64 > self.large_upload_threshold {
            info!(
                "File size {} bytes exceeds {} bytes, using resumable upload",
                file_data.len(),
                self.large_upload_threshold
            );
            self.upload_large_file_to_parent(&file_data, file_name, parent_id)
                .await
        } else {
            self.upload_new_file_to_parent(file_data, file_name, parent_id)
                .await
        }
    }

    /// Simple upload of a new file into a parent folder
    pub async fn upload_new_file_to_parent(
        &self,
        file_data: Vec<u8>,
        file_name: &str,
        parent_id: &str,
    ) -> Result<DriveItem> {
        let auth_header = self.auth_header().await?;
        let upload_url = format!(
            "/me/drive/items/{}:/{}:/content?@microsoft.graph.conflictBehavior=fail",
            encode(parent_id),
            encode(file_name)
        );
        info!("Uploading file: {} to parent {}", file_name, parent_id);

        let response = self
            .http_client
            .upload_file(&upload_url, file_data, &auth_header)
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to upload file ({}): {}", status, error_text));
        }

        let item: DriveItem = response
            .json()
            .await
            .context("Failed to parse upload response")?;
        info!("Uploaded file: {} to parent {} -> {}", file_name, parent_id, item.id);
        Ok(item)
    }

    /// Create an upload session for a new file
    async fn create_upload_session(
        &self,
        parent_id: &str,
        file_name: &str,
    ) -> Result<UploadSessionResponse> {
        let auth_header = self.auth_header().await?;
        let url = format!(
            "/me/drive/items/{}:/{}:/createUploadSession",
            encode(parent_id),
            encode(file_name)
        );
        let request_body = UploadSessionRequest {
            item: UploadSessionItem {
                conflict_behavior: "fail".to_string(),
                name: file_name.to_string(),
            },
        };

        let session: UploadSessionResponse = self
            .http_client
            .post(&url, &request_body, &auth_header)
            .await
            .context("Failed to create upload session")?;

        debug!("Created upload session for {} in {}", file_name, parent_id);
        Ok(session)
    }

    /// Upload a large file chunk by chunk through an upload session
    pub async fn upload_large_file_to_parent(
        &self,
        file_data: &[u8],
        file_name: &str,
        parent_id: &str,
    ) -> Result<DriveItem> {
        let session = self.create_upload_session(parent_id, file_name).await?;
        let total_size = file_data.len() as u64;
        let chunks = split_into_chunks(total_size, self.chunk_size);

        for (index, chunk) in chunks.iter().enumerate() {
            let content_range = format!("bytes {}-{}/{}", chunk.start, chunk.end, total_size);
            let data = file_data[chunk.start as usize..=chunk.end as usize].to_vec();
            let response = self
                .http_client
                .upload_file_chunk(&session.upload_url, data, &content_range)
                .await?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(anyhow!(
                    "Upload chunk {} failed with status {}: {}",
                    content_range,
                    status,
                    error_text
                ));
            }

            info!("Upload progress: {}/{} chunks", index + 1, chunks.len());

            // 200/201 carries the finished item, 202 asks for the next range
            if index == chunks.len() - 1 {
                let item: DriveItem = response
                    .json()
                    .await
                    .context("Failed to parse final upload response")?;
                info!("Completed large file upload: {} -> {}", file_name, item.id);
                return Ok(item);
            }
        }

        Err(anyhow!("Nothing to upload for {}", file_name))
    }

    /// Delete an item by ID
    pub async fn delete_item(&self, item_id: &str) -> Result<()> {
        let auth_header = self.auth_header().await?;
        let url = format!("/me/drive/items/{}", encode(item_id));

        self.http_client
            .delete(&url, &auth_header)
            .await
            .context("Failed to delete item")?;

        info!("Deleted item: {}", item_id);
        Ok(())
    }

    /// Start streaming the content of an item
    pub async fn download_stream(&self, item_id: &str) -> Result<DownloadStream> {
        let auth_header = self.auth_header().await?;
        let url = format!("/me/drive/items/{}/content", encode(item_id));

        let response = self
            .http_client
            .download(&url, &auth_header)
            .await
            .context("Failed to start download")?;

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.context("Failed to read download stream"));
        Ok(Box::pin(stream))
    }
}

/// Path-relative address of the child `name` of `parent_id`
pub fn child_by_name_url(parent_id: &str, name: &str) -> String {
    format!("/me/drive/items/{}:/{}", encode(parent_id), encode(name))
}

/// Split `total_size` bytes into inclusive ranges of at most `chunk_size`
pub fn split_into_chunks(total_size: u64, chunk_size: u64) -> Vec<FileChunk> {
    let mut chunks = Vec::new();
    let chunk_size = chunk_size.max(1);

    let mut start = 0;
    while start < total_size {
        let end = std::cmp::min(start + chunk_size - 1, total_size - 1);
        chunks.push(FileChunk { start, end });
        start = end + 1;
    }

    chunks
}

#[async_trait]
impl RemoteStore for OneDriveClient {
    async fn get_by_id(&self, id: &str) -> Result<RemoteObject> {
        Ok(self.get_item_by_id(id).await?.into())
    }

    async fn list_children(&self, parent_id: &str, query: &ChildQuery) -> Result<Vec<RemoteObject>> {
        let items = match &query.name {
            Some(name) => self
                .get_child_by_name(parent_id, name)
                .await?
                .into_iter()
                .collect(),
            None => self.get_children(parent_id).await?,
        };

        let children = items
            .into_iter()
            .map(RemoteObject::from)
            .filter(|object| query.matches(object))
            .collect();
        Ok(children)
    }

    async fn create_object(
        &self,
        parent_id: &str,
        name: &str,
        is_container: bool,
        content: Option<Vec<u8>>,
    ) -> Result<RemoteObject> {
        let item = if is_container {
            self.create_folder(parent_id, name).await?
        } else {
            self.upload_file_smart(content.unwrap_or_default(), name, parent_id)
                .await?
        };
        Ok(item.into())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_item(id).await
    }

    async fn open_download_stream(&self, id: &str) -> Result<DownloadStream> {
        self.download_stream(id).await
    }
}
