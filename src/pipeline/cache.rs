//! Result Cache
//!
//! Live tables keyed by resolved collection id, expiring after a fixed TTL.

use super::models::{CollectionRef, ResultTable};
use crate::config::PipelineSettings;
use crate::metrics;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A cached live result.
#[derive(Debug, Clone)]
pub struct CachedTable {
    pub collection: CollectionRef,
    pub table: ResultTable,
    stored_at: Instant,
}

impl CachedTable {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// Process-wide table cache. Many readers, last writer wins.
pub struct TableCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CachedTable>>,
}

impl TableCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Empty cache with the TTL configured in `settings`.
    pub fn for_settings(settings: &PipelineSettings) -> Self {
        Self::new(Duration::from_secs(settings.cache_ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `collection_id`, if any.
    pub fn get(&self, collection_id: &str) -> Option<CachedTable> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let hit = entries
            .get(collection_id)
            .filter(|entry| entry.is_fresh(self.ttl))
            .cloned();

        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    /// Store a live result. Expired entries are dropped on the way.
    pub fn insert(&self, collection: CollectionRef, table: ResultTable) {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.is_fresh(ttl));
        entries.insert(
            collection.id.clone(),
            CachedTable {
                collection,
                table,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(self.ttl));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
