//! Path-addressed filesystem over a [`RemoteStore`]
//!
//! `DriveFs` is what a protocol server talks to. It owns one cache and
//! shares it between the resolver, the lister and every handle it opens, so
//! two instances never see each other's entries.

use crate::config::FsConfig;
use crate::fs::cache::LookupCache;
use crate::fs::error::{FsError, FsResult};
use crate::fs::lister::DirectoryLister;
use crate::fs::metadata::Metadata;
use crate::fs::path::{display_path, is_root, normalize_path, split_parent};
use crate::fs::read_handle::ReadHandle;
use crate::fs::resolver::PathResolver;
use crate::fs::write_handle::{create_at_path, WriteHandle};
use crate::onedrive_service::onedrive_client::RemoteStore;
use crate::onedrive_service::onedrive_models::RemoteObject;
use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;

/// How a path is to be opened, in the manner of `std::fs::OpenOptions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub read: bool,
    pub write: bool,
    pub append: bool,
    pub create: bool,
    pub truncate: bool,
}

impl OpenOptions {
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Whole-object create, the only supported write mode
    pub fn create_truncate() -> Self {
        Self {
            write: true,
            create: true,
            truncate: true,
            ..Self::default()
        }
    }

    fn is_read_only(&self) -> bool {
        self.read && !self.write && !self.append && !self.create && !self.truncate
    }

    fn is_create_truncate(&self) -> bool {
        !self.read && self.write && !self.append && self.create && self.truncate
    }
}

/// A handle returned by [`DriveFs::open`].
pub enum OpenHandle {
    Read(ReadHandle),
    Write(WriteHandle),
}

pub struct DriveFs {
    store: Arc<dyn RemoteStore>,
    cache: Arc<LookupCache>,
    resolver: Arc<PathResolver>,
    lister: Arc<DirectoryLister>,
    config: FsConfig,
}

impl DriveFs {
    /// Build a filesystem with its own empty cache.
    ///
    /// Fails if `config` has a zero TTL or timeout.
    pub fn new(store: Arc<dyn RemoteStore>, config: FsConfig) -> Result<Self> {
        config.validate().context("Invalid filesystem configuration")?;

        let cache = Arc::new(LookupCache::from_config(&config));
        let resolver = Arc::new(PathResolver::new(store.clone(), cache.clone()));
        let lister = Arc::new(DirectoryLister::new(store.clone(), cache.clone()));
        Ok(Self {
            store,
            cache,
            resolver,
            lister,
            config,
        })
    }

    pub fn cache(&self) -> &Arc<LookupCache> {
        &self.cache
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    pub async fn stat(&self, path: &str) -> FsResult<Metadata> {
        let path = normalize_path(path);
        debug!("stat {}", display_path(&path));
        let object = self.resolver.resolve_normalized(&path, false).await?;
        Ok(Metadata::from(&object))
    }

    /// Open an existing file or folder for reading.
    ///
    /// Nothing is downloaded until the first read.
    pub async fn open_for_read(&self, path: &str) -> FsResult<ReadHandle> {
        let path = normalize_path(path);
        debug!("open_for_read {}", display_path(&path));
        let object = self.resolver.resolve_normalized(&path, false).await?;
        Ok(ReadHandle::new(
            path,
            object,
            self.store.clone(),
            self.lister.clone(),
            self.config.stall_timeout,
        ))
    }

    /// Start a create session for `path`.
    ///
    /// Existence and parent checks happen on close, not here.
    pub fn open_for_create(&self, path: &str) -> WriteHandle {
        let path = normalize_path(path);
        debug!("open_for_create {}", display_path(&path));
        WriteHandle::new(
            path,
            self.resolver.clone(),
            self.store.clone(),
            self.cache.clone(),
        )
    }

    /// Open with explicit flags; only plain reads and whole-object creates
    /// are supported.
    pub async fn open(&self, path: &str, options: &OpenOptions) -> FsResult<OpenHandle> {
        if options.is_read_only() {
            return self.open_for_read(path).await.map(OpenHandle::Read);
        }
        if options.is_create_truncate() {
            return Ok(OpenHandle::Write(self.open_for_create(path)));
        }
        Err(FsError::unsupported(format!(
            "open {} with {:?}",
            display_path(&normalize_path(path)),
            options
        )))
    }

    pub async fn make_container(&self, path: &str) -> FsResult<RemoteObject> {
        let path = normalize_path(path);
        debug!("make_container {}", display_path(&path));
        create_at_path(
            &self.resolver,
            self.store.as_ref(),
            &self.cache,
            &path,
            true,
            None,
        )
        .await
    }

    /// Delete the object at `path` together with everything below it.
    ///
    /// The store removes a folder's descendants itself; their cached lookups
    /// are dropped along with those of the path and its parent.
    pub async fn remove_recursive(&self, path: &str) -> FsResult<()> {
        let path = normalize_path(path);
        debug!("remove_recursive {}", display_path(&path));

        let Some((parent_path, _)) = split_parent(&path) else {
            return Err(FsError::unsupported("removing the root folder"));
        };

        let object = self.resolver.resolve_normalized(&path, false).await?;
        let parent = self.resolver.resolve_normalized(parent_path, true).await?;

        self.store.delete(&object.id).await?;
        self.cache.invalidate_mutation(&path, &parent.id);
        info!("Removed {} ({})", path, object.id);
        Ok(())
    }

    pub async fn list_children(&self, path: &str) -> FsResult<Vec<Metadata>> {
        let path = normalize_path(path);
        debug!("list_children {}", display_path(&path));

        let container = match self.resolver.resolve_normalized(&path, true).await {
            Ok(container) => container,
            // A file at the path is reported as such, not as missing
            Err(FsError::NotFound(_)) if !is_root(&path) => {
                self.resolver.resolve_normalized(&path, false).await?;
                return Err(FsError::NotAContainer(display_path(&path).to_string()));
            }
            Err(e) => return Err(e),
        };

        let listing = self.lister.list_children(&path, &container).await?;
        Ok(listing.iter().map(Metadata::from).collect())
    }

    pub async fn rename(&self, from: &str, to: &str) -> FsResult<()> {
        Err(FsError::unsupported(format!(
            "rename {} to {}",
            display_path(&normalize_path(from)),
            display_path(&normalize_path(to))
        )))
    }
}
