//! Background purge of expired cache entries
//!
//! Expired entries are already ignored on access; the janitor only keeps
//! entries nobody asks for again from piling up.

use crate::fs::cache::LookupCache;
use log::{debug, info};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn a task purging `cache` every `interval`.
///
/// The task holds only a weak reference and ends by itself once the cache
/// is dropped. Abort the returned handle to stop it earlier.
pub fn spawn_cache_janitor(cache: &Arc<LookupCache>, interval: Duration) -> JoinHandle<()> {
    let cache: Weak<LookupCache> = Arc::downgrade(cache);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(cache) = cache.upgrade() else {
                info!("Cache dropped, stopping cache janitor");
                break;
            };

            let purged = cache.purge_expired();
            if purged > 0 {
                debug!("Purged {} expired cache entries, {} left", purged, cache.len());
            }
        }
    })
}
