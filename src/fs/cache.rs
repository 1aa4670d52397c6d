//! Time-bounded lookup cache fronting path resolution and directory listing
//!
//! Two typed namespaces share one cache instance:
//! - `path-lookup:<path>` holds the object a path resolved to,
//! - `dir-listing:<container id>` holds a snapshot of a container's children.
//!
//! Only successes are stored. A failed lookup leaves no trace, so the next
//! call goes back to the store. Concurrent misses on the same key are not
//! coalesced: each caller queries the store and the last insert wins.

use crate::config::FsConfig;
use crate::fs::error::FsResult;
use crate::fs::path::{display_path, is_root, parent_path};
use crate::onedrive_service::onedrive_models::RemoteObject;
use log::trace;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Key of the `path-lookup` namespace.
///
/// A lookup that required a container and one that did not can resolve to
/// different objects, so both are cached separately. Paths are stored
/// lowercased since drive item names are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub path: String,
    pub require_container: bool,
}

impl LookupKey {
    pub fn new(path: &str, require_container: bool) -> Self {
        Self {
            path: path.to_lowercase(),
            require_container,
        }
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path-lookup:{}", self.path)?;
        if self.require_container {
            write!(f, " (folder)")?;
        }
        Ok(())
    }
}

/// Key of the `dir-listing` namespace: the ID of the listed container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey(pub String);

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dir-listing:{}", self.0)
    }
}

/// Snapshot of a container's visible children.
pub type Listing = Arc<Vec<RemoteObject>>;

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrency-safe map with per-entry expiry.
struct TtlMap<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlMap<K, V>
where
    K: Eq + Hash + Clone + fmt::Display,
    V: Clone,
{
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: drop it unless someone refreshed it meanwhile
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
            entries.remove(key);
            trace!("Cache entry expired: {}", key);
        }
        None
    }

    fn insert(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    fn remove(&self, key: &K) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    fn remove_where(&self, mut doomed: impl FnMut(&K) -> bool) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|key, _| !doomed(key));
        before - entries.len()
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn get_or_resolve<F, Fut>(&self, key: K, ttl: Duration, resolve: F) -> FsResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FsResult<V>>,
    {
        if let Some(value) = self.get(&key) {
            trace!("Cache hit: {}", key);
            return Ok(value);
        }

        trace!("Cache miss: {}", key);
        let value = resolve().await?;
        self.insert(key, value.clone(), ttl);
        Ok(value)
    }
}

/// Shared cache owned by one filesystem instance.
pub struct LookupCache {
    lookups: TtlMap<LookupKey, RemoteObject>,
    listings: TtlMap<ListingKey, Listing>,
    lookup_ttl: Duration,
    listing_ttl: Duration,
}

impl LookupCache {
    pub fn new(lookup_ttl: Duration, listing_ttl: Duration) -> Self {
        Self {
            lookups: TtlMap::new(),
            listings: TtlMap::new(),
            lookup_ttl,
            listing_ttl,
        }
    }

    pub fn from_config(config: &FsConfig) -> Self {
        Self::new(config.lookup_ttl, config.listing_ttl)
    }

    pub fn lookup_ttl(&self) -> Duration {
        self.lookup_ttl
    }

    pub fn listing_ttl(&self) -> Duration {
        self.listing_ttl
    }

    /// Cached path resolution, falling back to `resolve` on a miss.
    pub async fn get_or_resolve_lookup<F, Fut>(
        &self,
        path: &str,
        require_container: bool,
        resolve: F,
    ) -> FsResult<RemoteObject>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FsResult<RemoteObject>>,
    {
        self.lookups
            .get_or_resolve(LookupKey::new(path, require_container), self.lookup_ttl, resolve)
            .await
    }

    /// Cached children snapshot, falling back to `resolve` on a miss.
    pub async fn get_or_resolve_listing<F, Fut>(
        &self,
        container_id: &str,
        resolve: F,
    ) -> FsResult<Listing>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FsResult<Listing>>,
    {
        self.listings
            .get_or_resolve(ListingKey(container_id.to_string()), self.listing_ttl, resolve)
            .await
    }

    pub fn cached_lookup(&self, path: &str, require_container: bool) -> Option<RemoteObject> {
        self.lookups.get(&LookupKey::new(path, require_container))
    }

    pub fn cached_listing(&self, container_id: &str) -> Option<Listing> {
        self.listings.get(&ListingKey(container_id.to_string()))
    }

    /// Record what a path resolves to without asking the store.
    ///
    /// A container also satisfies the folder-only lookup of the same path.
    pub fn warm_lookup(&self, path: &str, object: &RemoteObject) {
        trace!("Warming {} -> {}", LookupKey::new(path, false), object.id);
        self.lookups
            .insert(LookupKey::new(path, false), object.clone(), self.lookup_ttl);
        if object.is_container {
            self.lookups
                .insert(LookupKey::new(path, true), object.clone(), self.lookup_ttl);
        }
    }

    /// Drop the lookup entries of exactly this path.
    pub fn invalidate(&self, path: &str) {
        trace!("Invalidating path {}", display_path(path));
        self.lookups.remove(&LookupKey::new(path, false));
        self.lookups.remove(&LookupKey::new(path, true));
    }

    /// Drop the lookup entries of everything below this path.
    pub fn invalidate_descendants(&self, path: &str) {
        if is_root(path) {
            return;
        }
        let prefix = format!("{}/", path.to_lowercase());
        let removed = self.lookups.remove_where(|key| key.path.starts_with(&prefix));
        if removed > 0 {
            trace!("Invalidated {} entries below {}", removed, path);
        }
    }

    pub fn invalidate_listing(&self, container_id: &str) {
        let key = ListingKey(container_id.to_string());
        trace!("Invalidating {}", key);
        self.listings.remove(&key);
    }

    /// Invalidation after an object was created or removed at `path` inside
    /// the container `parent_id`. Lookups below `path` go too, since a
    /// removed folder takes its descendants with it.
    ///
    /// These are independent removals, not one atomic step.
    pub fn invalidate_mutation(&self, path: &str, parent_id: &str) {
        self.invalidate(path);
        self.invalidate_descendants(path);
        self.invalidate(parent_path(path));
        self.invalidate_listing(parent_id);
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.lookups.purge_expired() + self.listings.purge_expired()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lookups.len() + self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
