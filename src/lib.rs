//! Playlist Telemetry Library
//!
//! Acquisition pipeline for playlist audio-feature tables, with the API
//! client, configuration and export helpers the `telemetry` binary uses.

pub mod catalog_api;
pub mod cli_style;
pub mod config;
pub mod export;
pub mod metrics;
pub mod pipeline;
pub mod summary;

// Re-export commonly used types for convenience
pub use catalog_api::{ApiError, ApiErrorKind, CatalogApi, ClientSettings, SpotifyClient};
pub use config::{AppConfig, CliConfig, Credentials, FileConfig, PipelineSettings};
pub use pipeline::{
    run_pipeline, run_pipeline_with_cache, Pipeline, PipelineError, PipelineOutput, Provenance,
    ResultTable, Row,
};
pub use summary::{summarize, TableSummary};
