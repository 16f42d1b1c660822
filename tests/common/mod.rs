//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{settings_for, FakeCatalogApi, COLLECTION_ID};
//! use playlist_telemetry::Pipeline;
//!
//! #[test]
//! fn test_live_run() {
//!     let api = FakeCatalogApi::standard();
//!     let output = Pipeline::new(api, settings_for(COLLECTION_ID)).run().unwrap();
//!     assert!(!output.table.is_empty());
//! }
//! ```

mod constants;
mod fake_api;
mod fixtures;

pub use constants::*;
pub use fake_api::FakeCatalogApi;
#[allow(unused_imports)]
pub use fixtures::{raw_entry, raw_features, settings_for, track_id};
