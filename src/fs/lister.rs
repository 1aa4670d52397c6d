//! Directory listing with cache warm-up
//!
//! Each freshly fetched listing also seeds the path-lookup entry of every
//! listed child, so resolving a child right after listing its folder costs no
//! store query.

use crate::fs::cache::{Listing, LookupCache};
use crate::fs::error::{FsError, FsResult};
use crate::fs::path::{display_path, join_child};
use crate::onedrive_service::onedrive_client::{ChildQuery, RemoteStore};
use crate::onedrive_service::onedrive_models::RemoteObject;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

pub struct DirectoryLister {
    store: Arc<dyn RemoteStore>,
    cache: Arc<LookupCache>,
}

impl DirectoryLister {
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<LookupCache>) -> Self {
        Self { store, cache }
    }

    /// Visible children of `container`, which lives at `container_path`.
    pub async fn list_children(
        &self,
        container_path: &str,
        container: &RemoteObject,
    ) -> FsResult<Listing> {
        if !container.is_container {
            return Err(FsError::NotAContainer(display_path(container_path).to_string()));
        }

        self.cache
            .get_or_resolve_listing(&container.id, || self.fetch(container_path, &container.id))
            .await
    }

    async fn fetch(&self, container_path: &str, container_id: &str) -> FsResult<Listing> {
        let children: Vec<RemoteObject> = self
            .store
            .list_children(container_id, &ChildQuery::all())
            .await?
            .into_iter()
            .filter(|child| !child.trashed)
            .collect();

        debug!(
            "Listed {} visible children of {}",
            children.len(),
            display_path(container_path)
        );

        // First sibling of a name wins, as it does for resolution
        let mut seen = HashSet::new();
        for child in children.iter() {
            if seen.insert(child.name.to_lowercase()) {
                self.cache
                    .warm_lookup(&join_child(container_path, &child.name), child);
            }
        }

        Ok(Arc::new(children))
    }
}
