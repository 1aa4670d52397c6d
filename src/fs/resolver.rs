//! Path to remote object resolution
//!
//! A path is resolved one segment at a time: the parent path is resolved
//! (as a folder, through the cache) and then the store is asked for the
//! parent's children carrying the last segment's name.
//!
//! The store does not keep sibling names unique. When several visible
//! children share the name, the first one in the order the store returned
//! them wins. That choice is arbitrary and not stable across queries.

use crate::fs::cache::LookupCache;
use crate::fs::error::{FsError, FsResult};
use crate::fs::path::{display_path, is_root, normalize_path, split_parent};
use crate::onedrive_service::onedrive_client::{ChildQuery, RemoteStore};
use crate::onedrive_service::onedrive_models::RemoteObject;
use futures_util::future::BoxFuture;
use log::{debug, trace};
use std::sync::Arc;

pub struct PathResolver {
    store: Arc<dyn RemoteStore>,
    cache: Arc<LookupCache>,
}

impl PathResolver {
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<LookupCache>) -> Self {
        Self { store, cache }
    }

    /// Resolve an absolute path to the object it denotes.
    ///
    /// With `require_container` only folders match the final segment.
    pub async fn resolve(&self, path: &str, require_container: bool) -> FsResult<RemoteObject> {
        let path = normalize_path(path);
        self.resolve_normalized(&path, require_container).await
    }

    /// Same as [`resolve`](Self::resolve) for an already normalized path.
    pub fn resolve_normalized<'a>(
        &'a self,
        path: &'a str,
        require_container: bool,
    ) -> BoxFuture<'a, FsResult<RemoteObject>> {
        Box::pin(async move {
            if is_root(path) {
                return Ok(RemoteObject::root());
            }

            self.cache
                .get_or_resolve_lookup(path, require_container, || {
                    self.lookup_uncached(path, require_container)
                })
                .await
        })
    }

    async fn lookup_uncached(&self, path: &str, require_container: bool) -> FsResult<RemoteObject> {
        let (parent_path, name) =
            split_parent(path).ok_or_else(|| FsError::NotFound(display_path(path).to_string()))?;

        let parent = self
            .resolve_normalized(parent_path, true)
            .await
            .inspect_err(|e| debug!("Can't locate parent {}: {}", display_path(parent_path), e))?;

        let query = ChildQuery::named(name, require_container);
        trace!("Querying children of {} for {:?}", parent.id, query);
        let candidates = self.store.list_children(&parent.id, &query).await?;

        candidates
            .into_iter()
            .find(|candidate| !candidate.trashed && query.matches(candidate))
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }
}
