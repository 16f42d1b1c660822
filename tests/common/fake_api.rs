//! Scripted in-memory implementation of the streaming API.

use super::constants::*;
use super::fixtures::{raw_entry, raw_features, track_id};
use playlist_telemetry::catalog_api::{RawAudioFeatures, RawEntry};
use playlist_telemetry::pipeline::CollectionRef;
use playlist_telemetry::{ApiError, ApiErrorKind, CatalogApi};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeCatalogApi {
    collections: HashMap<String, (CollectionRef, Vec<RawEntry>)>,
    searches: HashMap<String, String>,
    features: HashMap<String, RawAudioFeatures>,
    /// Feature batches (by first id) that always fail.
    failing_batches: HashSet<String>,
    offline: bool,
    calls: AtomicUsize,
    feature_calls: AtomicUsize,
}

impl FakeCatalogApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard collection, its search query, an unusable collection and
    /// a large collection, all with full feature coverage.
    pub fn standard() -> Self {
        Self::new()
            .with_generated_collection(COLLECTION_ID, COLLECTION_NAME, COLLECTION_TRACKS)
            .with_generated_collection(LARGE_COLLECTION_ID, "Large", LARGE_COLLECTION_TRACKS)
            .with_collection(
                EMPTY_COLLECTION_ID,
                "Local Files",
                vec![RawEntry {
                    track: None,
                    is_local: true,
                }],
            )
            .with_search(SEARCH_QUERY, COLLECTION_ID)
    }

    pub fn with_collection(mut self, id: &str, name: &str, entries: Vec<RawEntry>) -> Self {
        let collection = CollectionRef {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.collections.insert(id.to_string(), (collection, entries));
        self
    }

    /// A collection of `tracks` usable entries, each with features.
    pub fn with_generated_collection(mut self, id: &str, name: &str, tracks: usize) -> Self {
        let entries = (0..tracks)
            .map(|i| {
                let track = track_id(id, i);
                self.features
                    .insert(track.clone(), raw_features(&track, i));
                raw_entry(&track, i)
            })
            .collect();
        self.with_collection(id, name, entries)
    }

    pub fn with_search(mut self, query: &str, collection_id: &str) -> Self {
        self.searches
            .insert(query.to_string(), collection_id.to_string());
        self
    }

    pub fn without_features(mut self) -> Self {
        self.features.clear();
        self
    }

    /// Make the feature batch starting with `first_id` fail every time.
    pub fn failing_batch(mut self, first_id: &str) -> Self {
        self.failing_batches.insert(first_id.to_string());
        self
    }

    /// Every call fails as if the network were down.
    pub fn offline(mut self) -> Self {
        self.offline = true;
        self
    }

    /// Total calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn feature_calls(&self) -> usize {
        self.feature_calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(ApiError::new(ApiErrorKind::Connection, "network unreachable"));
        }
        Ok(())
    }
}

impl CatalogApi for FakeCatalogApi {
    fn get_collection(&self, collection_id: &str) -> Result<CollectionRef, ApiError> {
        self.enter()?;
        self.collections
            .get(collection_id)
            .map(|(collection, _)| collection.clone())
            .ok_or_else(|| ApiError::new(ApiErrorKind::NotFound, collection_id))
    }

    fn search_collection(&self, query: &str) -> Result<Option<CollectionRef>, ApiError> {
        self.enter()?;
        Ok(self
            .searches
            .get(query)
            .and_then(|id| self.collections.get(id))
            .map(|(collection, _)| collection.clone()))
    }

    fn collection_entries(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<RawEntry>, ApiError> {
        self.enter()?;
        self.collections
            .get(collection_id)
            .map(|(_, entries)| entries.iter().take(limit).cloned().collect())
            .ok_or_else(|| ApiError::new(ApiErrorKind::NotFound, collection_id))
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<RawAudioFeatures>>, ApiError> {
        self.enter()?;
        self.feature_calls.fetch_add(1, Ordering::SeqCst);
        if ids
            .first()
            .is_some_and(|first| self.failing_batches.contains(first))
        {
            return Err(ApiError::new(ApiErrorKind::Status, "502 Bad Gateway"));
        }
        Ok(ids.iter().map(|id| self.features.get(id).cloned()).collect())
    }
}
