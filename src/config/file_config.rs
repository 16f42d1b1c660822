use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub credentials: Option<CredentialsConfig>,
    pub source: Option<SourceConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub fallback: Option<FallbackConfig>,
    pub api: Option<ApiConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SourceConfig {
    /// Ordered candidates; `search:<query>` entries are free-text searches.
    pub candidates: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: Option<usize>,
    pub page_size: Option<usize>,
    /// "collection" or "retrieval"
    pub row_order: Option<String>,
    pub cache_ttl_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FallbackConfig {
    /// "static", "dataset" or "synthetic"
    pub mode: Option<String>,
    pub dataset_path: Option<String>,
    pub synthetic_rows: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub api_base_url: Option<String>,
    pub token_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub min_request_interval_ms: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
