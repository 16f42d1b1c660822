//! Shared constants for integration tests
//!
//! When the test collection changes, update only this file.

/// Credentials accepted by the fake API and the mock server
pub const TEST_CLIENT_ID: &str = "test-client-id";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";

/// Collection with ten fully covered tracks
pub const COLLECTION_ID: &str = "37i9dQZF1DX0BcQWzuB7ZO";
pub const COLLECTION_NAME: &str = "Ibiza 2025";
pub const COLLECTION_TRACKS: usize = 10;

/// Search query resolving to [`COLLECTION_ID`]
pub const SEARCH_QUERY: &str = "ibiza 2025";

/// Collection whose entries are all unusable
pub const EMPTY_COLLECTION_ID: &str = "pl-only-local-files";

/// Large collection used for batching scenarios
pub const LARGE_COLLECTION_ID: &str = "pl-large";
pub const LARGE_COLLECTION_TRACKS: usize = 120;

/// Seed for reproducible synthetic fallback tables
pub const FALLBACK_SEED: u64 = 2025;
