//! The acquisition pipeline.
//!
//! Resolver -> filter -> batcher -> assembler, wrapped by a degradation
//! switch that swaps in a fallback table whenever live data cannot be
//! produced. Only configuration errors reach the caller.

pub mod assembler;
pub mod batcher;
pub mod cache;
pub mod fallback;
pub mod filter;
pub mod models;
pub mod resolver;

pub use batcher::{BatchOutcome, FeatureBatcher, RetryPolicy};
pub use cache::TableCache;
pub use fallback::{build_fallback, FallbackTable};
pub use filter::{filter_entries, FilteredItems};
pub use models::*;
pub use resolver::{ResolvedSource, SourceResolver};

use crate::catalog_api::{CatalogApi, SpotifyClient};
use crate::config::{AppConfig, PipelineSettings};
use crate::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No source candidate resolved (tried: {})", .attempted.join(", "))]
    SourceUnavailable { attempted: Vec<String> },

    #[error("{} of {total_batches} feature batches failed", .failed_batches.len())]
    PartialFetchFailure {
        failed_batches: Vec<usize>,
        total_batches: usize,
    },

    #[error("No feature batch succeeded ({failed_batches} of {total_batches} failed): {last_error}")]
    TotalFetchFailure {
        failed_batches: usize,
        total_batches: usize,
        last_error: String,
    },

    #[error("Collection {collection} produced no rows")]
    NoRows { collection: String },
}

impl PipelineError {
    /// Fallback reason for failures the degradation switch absorbs, `None`
    /// for failures that must reach the caller.
    pub fn fallback_reason(&self) -> Option<String> {
        match self {
            PipelineError::Configuration(_) => None,
            PipelineError::SourceUnavailable { .. } => {
                Some(format!("source unavailable: {}", self))
            }
            PipelineError::TotalFetchFailure { .. } => {
                Some(format!("feature fetch failed: {}", self))
            }
            PipelineError::NoRows { .. } => Some(format!("empty result: {}", self)),
            PipelineError::PartialFetchFailure { .. } => {
                Some(format!("incomplete features: {}", self))
            }
        }
    }
}

/// Why and from where a fallback table was used.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackInfo {
    pub origin: FallbackOrigin,
    pub reason: String,
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub candidates_tried: usize,
    pub entries_received: usize,
    pub items_kept: usize,
    pub batches_issued: usize,
    pub failed_batches: usize,
    pub attributes_fetched: usize,
    pub rows: usize,
    pub from_cache: bool,
}

/// Result of [`Pipeline::run`]. The table is never empty.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: ResultTable,
    pub provenance: Provenance,
    /// The resolved collection, when resolution got that far.
    pub collection: Option<CollectionRef>,
    pub fallback: Option<FallbackInfo>,
    pub stats: RunStats,
    pub generated_at: DateTime<Utc>,
}

pub struct Pipeline<A: CatalogApi> {
    api: A,
    settings: PipelineSettings,
    cache: Option<Arc<TableCache>>,
}

impl<A: CatalogApi> Pipeline<A> {
    pub fn new(api: A, settings: PipelineSettings) -> Self {
        Self {
            api,
            settings,
            cache: None,
        }
    }

    /// Share a result cache with other pipelines.
    pub fn with_cache(mut self, cache: Arc<TableCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the chain once.
    ///
    /// Returns a non-empty table labelled `live` or `fallback`. The only
    /// error is [`PipelineError::Configuration`], raised before any request.
    pub fn run(&self) -> Result<PipelineOutput, PipelineError> {
        self.settings
            .validate()
            .map_err(PipelineError::Configuration)?;

        let mut stats = RunStats::default();
        let mut collection = None;
        match self.run_live(&mut stats, &mut collection) {
            Ok(table) => {
                stats.rows = table.len();
                metrics::record_pipeline_run(Provenance::Live.as_str());
                info!(
                    "Live run produced {} rows from {} items ({} of {} batches failed)",
                    table.len(),
                    stats.items_kept,
                    stats.failed_batches,
                    stats.batches_issued
                );
                Ok(PipelineOutput {
                    table,
                    provenance: Provenance::Live,
                    collection,
                    fallback: None,
                    stats,
                    generated_at: Utc::now(),
                })
            }
            Err(e) => match e.fallback_reason() {
                Some(reason) => Ok(degrade(&self.settings, reason, collection, stats)),
                None => {
                    error!("Pipeline failed: {}", e);
                    Err(e)
                }
            },
        }
    }

    fn run_live(
        &self,
        stats: &mut RunStats,
        collection: &mut Option<CollectionRef>,
    ) -> Result<ResultTable, PipelineError> {
        let resolved = SourceResolver::new(&self.api, self.settings.page_size)
            .resolve(&self.settings.sources)?;
        stats.candidates_tried = resolved.candidates_tried;
        stats.entries_received = resolved.entries_received;
        stats.items_kept = resolved.items.len();
        *collection = Some(resolved.collection.clone());

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&resolved.collection.id) {
                info!(
                    "Using cached table for collection {}",
                    resolved.collection.id
                );
                stats.from_cache = true;
                return Ok(hit.table);
            }
        }

        let batcher = FeatureBatcher::new(
            &self.api,
            self.settings.batch_size,
            RetryPolicy::new(&self.settings.retry),
        );
        let outcome = batcher.fetch(&resolved.items.ids())?;
        stats.batches_issued = outcome.batches_issued;
        stats.failed_batches = outcome.failed_batches.len();
        stats.attributes_fetched = outcome.len();
        if let Some(partial) = outcome.partial_failure() {
            warn!("Continuing with partial features: {}", partial);
        }

        let table = assembler::assemble(&resolved.items, &outcome, self.settings.row_order);
        if table.is_empty() {
            return Err(PipelineError::NoRows {
                collection: resolved.collection.id,
            });
        }

        if let Some(cache) = &self.cache {
            cache.insert(resolved.collection, table.clone());
        }
        Ok(table)
    }
}

/// Substitute a fallback table for a failed run.
fn degrade(
    settings: &PipelineSettings,
    reason: String,
    collection: Option<CollectionRef>,
    mut stats: RunStats,
) -> PipelineOutput {
    let fallback = build_fallback(&settings.fallback);
    warn!(
        "Serving {} fallback table ({} rows): {}",
        fallback.origin.as_str(),
        fallback.table.len(),
        reason
    );
    metrics::record_pipeline_run(Provenance::Fallback.as_str());

    stats.rows = fallback.table.len();
    PipelineOutput {
        table: fallback.table,
        provenance: Provenance::Fallback,
        collection,
        fallback: Some(FallbackInfo {
            origin: fallback.origin,
            reason,
        }),
        stats,
        generated_at: Utc::now(),
    }
}

/// Run the pipeline against the streaming API described by `config`.
pub fn run_pipeline(config: &AppConfig) -> Result<PipelineOutput, PipelineError> {
    run_pipeline_with_cache(config, None)
}

/// Like [`run_pipeline`], reusing live results from `cache` when fresh.
pub fn run_pipeline_with_cache(
    config: &AppConfig,
    cache: Option<Arc<TableCache>>,
) -> Result<PipelineOutput, PipelineError> {
    let settings = config.pipeline.clone();
    settings
        .validate()
        .map_err(PipelineError::Configuration)?;
    let credentials = settings
        .credentials
        .clone()
        .ok_or_else(|| PipelineError::Configuration("credentials are missing".to_string()))?;

    let client = match SpotifyClient::new(credentials, config.client.clone()) {
        Ok(client) => client,
        Err(e) => {
            let reason = format!("client unavailable: {}", e);
            return Ok(degrade(&settings, reason, None, RunStats::default()));
        }
    };

    let pipeline = Pipeline::new(client, settings);
    let pipeline = match cache {
        Some(cache) => pipeline.with_cache(cache),
        None => pipeline,
    };
    pipeline.run()
}
