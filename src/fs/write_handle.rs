//! Buffered, all-or-nothing create session
//!
//! Writes only accumulate in memory. Nothing reaches the store before
//! `close`, which creates the object in one go or fails without side
//! effects. The close-time upload has no timeout of its own, unlike reads.

use crate::fs::cache::LookupCache;
use crate::fs::error::{FsError, FsResult};
use crate::fs::metadata::Metadata;
use crate::fs::path::{display_path, split_parent};
use crate::fs::resolver::PathResolver;
use crate::onedrive_service::onedrive_client::RemoteStore;
use crate::onedrive_service::onedrive_models::RemoteObject;
use log::{debug, error, info};
use std::io::SeekFrom;
use std::sync::Arc;

pub struct WriteHandle {
    path: String,
    buffer: Vec<u8>,
    closed: bool,
    resolver: Arc<PathResolver>,
    store: Arc<dyn RemoteStore>,
    cache: Arc<LookupCache>,
}

impl WriteHandle {
    pub(crate) fn new(
        path: String,
        resolver: Arc<PathResolver>,
        store: Arc<dyn RemoteStore>,
        cache: Arc<LookupCache>,
    ) -> Self {
        Self {
            path,
            buffer: Vec::new(),
            closed: false,
            resolver,
            store,
            cache,
        }
    }

    pub fn path(&self) -> &str {
        display_path(&self.path)
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Size and name of what would be created on close
    pub fn stat(&self) -> Metadata {
        Metadata {
            name: split_parent(&self.path)
                .map(|(_, name)| name.to_string())
                .unwrap_or_default(),
            is_container: false,
            size: self.buffer.len() as u64,
            modified_at: None,
        }
    }

    /// Append to the staging buffer.
    pub fn write(&mut self, data: &[u8]) -> FsResult<usize> {
        if self.closed {
            return Err(FsError::HandleClosed(self.path().to_string()));
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }

    pub fn read(&mut self, _buf: &mut [u8]) -> FsResult<usize> {
        Err(FsError::unsupported(format!(
            "reading from {} opened for create",
            self.path()
        )))
    }

    pub fn seek(&mut self, pos: SeekFrom) -> FsResult<u64> {
        Err(FsError::unsupported(format!(
            "seek to {:?} on {} opened for create",
            pos,
            self.path()
        )))
    }

    /// Create the object from everything written so far.
    ///
    /// Fails with `AlreadyExists` if anything already lives at the path and
    /// with `InvalidParent` if the parent is not a folder; in both cases the
    /// store is left untouched. The handle is closed afterwards whatever the
    /// outcome.
    pub async fn close(&mut self) -> FsResult<RemoteObject> {
        if self.closed {
            return Err(FsError::HandleClosed(self.path().to_string()));
        }
        self.closed = true;
        debug!("Close {}", self.path());

        let content = std::mem::take(&mut self.buffer);
        let created = create_at_path(
            &self.resolver,
            self.store.as_ref(),
            &self.cache,
            &self.path,
            false,
            Some(content),
        )
        .await
        .inspect_err(|e| error!("Failed to create {}: {}", display_path(&self.path), e))?;

        debug!("Close successful {}", self.path());
        Ok(created)
    }
}

/// Create a new object at a normalized path, refusing to replace anything.
///
/// On success the path, its parent path and the parent's listing are
/// invalidated.
pub(crate) async fn create_at_path(
    resolver: &PathResolver,
    store: &dyn RemoteStore,
    cache: &LookupCache,
    path: &str,
    is_container: bool,
    content: Option<Vec<u8>>,
) -> FsResult<RemoteObject> {
    match resolver.resolve_normalized(path, false).await {
        Ok(existing) => {
            debug!("{} already exists as {}", display_path(path), existing.id);
            return Err(FsError::AlreadyExists(display_path(path).to_string()));
        }
        Err(FsError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let Some((parent_path, name)) = split_parent(path) else {
        return Err(FsError::AlreadyExists(display_path(path).to_string()));
    };

    let parent = match resolver.resolve_normalized(parent_path, true).await {
        Ok(parent) => parent,
        Err(FsError::NotFound(_)) => {
            return Err(FsError::InvalidParent(path.to_string()));
        }
        Err(e) => return Err(e),
    };

    let created = store
        .create_object(&parent.id, name, is_container, content)
        .await?;

    cache.invalidate_mutation(path, &parent.id);
    info!(
        "Created {} {} -> {}",
        if is_container { "folder" } else { "file" },
        path,
        created.id
    );
    Ok(created)
}
