//! Access to the external streaming API.
//!
//! The pipeline only talks to the [`CatalogApi`] trait; [`SpotifyClient`] is
//! the blocking HTTP implementation used by the binary.

pub mod client;
pub mod models;

pub use client::{ClientSettings, SpotifyClient};
pub use models::{RawAlbum, RawArtist, RawAudioFeatures, RawEntry, RawTrack};

use crate::pipeline::CollectionRef;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Provider ceiling for ids in one audio-features request.
pub const MAX_FEATURE_IDS_PER_REQUEST: usize = 100;

/// Provider ceiling for entries in one playlist page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Classification of an API failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Connection,   // Could not reach the provider - retry
    Timeout,      // Request timed out - retry
    NotFound,     // Unknown collection or resource - NO retry
    Unauthorized, // Credentials rejected - NO retry
    RateLimited,  // 429 - retry after the advertised delay
    Status,       // Other non-success status - retry
    Parse,        // Response body did not match the contract - retry
}

impl ApiErrorKind {
    /// Returns true if a request failing this way may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ApiErrorKind::NotFound | ApiErrorKind::Unauthorized)
    }

    /// Returns true if the failure means the provider could not be reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ApiErrorKind::Connection | ApiErrorKind::Timeout)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApiErrorKind::Connection => "connection",
            ApiErrorKind::Timeout => "timeout",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::Unauthorized => "unauthorized",
            ApiErrorKind::RateLimited => "rate_limited",
            ApiErrorKind::Status => "status",
            ApiErrorKind::Parse => "parse",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to the streaming API.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    /// Delay requested by the provider (`Retry-After`), if any.
    pub retry_after: Option<Duration>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Operations the pipeline needs from the streaming provider.
///
/// All calls are blocking round trips.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait CatalogApi: Send + Sync {
    /// Look up a collection by its identifier.
    fn get_collection(&self, collection_id: &str) -> Result<CollectionRef, ApiError>;

    /// Find the best matching collection for a free-text query.
    fn search_collection(&self, query: &str) -> Result<Option<CollectionRef>, ApiError>;

    /// Fetch the first page of entries of a collection.
    fn collection_entries(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<RawEntry>, ApiError>;

    /// Fetch audio features for up to [`MAX_FEATURE_IDS_PER_REQUEST`] ids.
    /// The result is positional, with `None` where the provider has no data.
    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<RawAudioFeatures>>, ApiError>;
}

impl<T: CatalogApi + ?Sized> CatalogApi for &T {
    fn get_collection(&self, collection_id: &str) -> Result<CollectionRef, ApiError> {
        (**self).get_collection(collection_id)
    }

    fn search_collection(&self, query: &str) -> Result<Option<CollectionRef>, ApiError> {
        (**self).search_collection(query)
    }

    fn collection_entries(
        &self,
        collection_id: &str,
        limit: usize,
    ) -> Result<Vec<RawEntry>, ApiError> {
        (**self).collection_entries(collection_id, limit)
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<RawAudioFeatures>>, ApiError> {
        (**self).audio_features(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ApiErrorKind::Connection.is_retryable());
        assert!(ApiErrorKind::Timeout.is_retryable());
        assert!(ApiErrorKind::RateLimited.is_retryable());
        assert!(ApiErrorKind::Status.is_retryable());
        assert!(ApiErrorKind::Parse.is_retryable());
        assert!(!ApiErrorKind::NotFound.is_retryable());
        assert!(!ApiErrorKind::Unauthorized.is_retryable());
    }

    #[test]
    fn test_connectivity_kinds() {
        assert!(ApiErrorKind::Connection.is_connectivity());
        assert!(ApiErrorKind::Timeout.is_connectivity());
        assert!(!ApiErrorKind::Status.is_connectivity());
        assert!(!ApiErrorKind::RateLimited.is_connectivity());
    }

    #[test]
    fn test_error_display() {
        let error = ApiError::new(ApiErrorKind::NotFound, "playlist xyz");
        assert_eq!(error.to_string(), "not_found error: playlist xyz");

        let limited = ApiError::new(ApiErrorKind::RateLimited, "slow down")
            .with_retry_after(Duration::from_secs(3));
        assert_eq!(limited.retry_after, Some(Duration::from_secs(3)));
    }
}
