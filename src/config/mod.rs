mod file_config;

pub use file_config::{
    ApiConfig, CredentialsConfig, FallbackConfig, FileConfig, PipelineConfig, SourceConfig,
};

use crate::catalog_api::client::{DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL};
use crate::catalog_api::{ClientSettings, MAX_FEATURE_IDS_PER_REQUEST, MAX_PAGE_SIZE};
use crate::pipeline::{FallbackMode, RowOrder, SourceCandidate};
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Candidate tried when no source is configured.
pub const DEFAULT_SOURCE: &str = "search:ibiza 2025";

/// Client-credentials pair for the streaming API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub sources: Vec<String>,
    pub batch_size: Option<usize>,
    pub page_size: Option<usize>,
    pub row_order: Option<RowOrder>,
    pub max_retries: Option<u32>,
    pub cache_ttl_secs: Option<u64>,
    pub fallback_mode: Option<FallbackMode>,
    pub dataset_path: Option<PathBuf>,
    pub synthetic_rows: Option<usize>,
    pub seed: Option<u64>,
    pub api_base_url: Option<String>,
    pub token_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub pipeline: PipelineSettings,
    pub client: ClientSettings,
}

/// Everything the acquisition pipeline needs for one run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// `None` makes the run fail with a configuration error before any request.
    pub credentials: Option<Credentials>,
    pub sources: Vec<SourceCandidate>,
    pub batch_size: usize,
    pub page_size: usize,
    pub row_order: RowOrder,
    pub retry: RetrySettings,
    pub cache_ttl_secs: u64,
    pub fallback: FallbackSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            credentials: None,
            sources: vec![SourceCandidate::Search("ibiza 2025".to_string())],
            batch_size: 50,
            page_size: 80,
            row_order: RowOrder::default(),
            retry: RetrySettings::default(),
            cache_ttl_secs: 600,
            fallback: FallbackSettings::default(),
        }
    }
}

impl PipelineSettings {
    /// Check credentials and every other setting.
    pub fn validate(&self) -> Result<(), String> {
        match &self.credentials {
            None => {
                return Err(
                    "streaming API credentials are missing (client id and client secret)"
                        .to_string(),
                )
            }
            Some(c) if c.client_id.trim().is_empty() || c.client_secret.trim().is_empty() => {
                return Err("streaming API credentials must not be empty".to_string())
            }
            Some(_) => {}
        }
        self.validate_settings()
    }

    /// Check the invariants the stages rely on, ignoring credentials.
    pub fn validate_settings(&self) -> Result<(), String> {
        if self.sources.is_empty() {
            return Err("at least one source candidate is required".to_string());
        }
        if !(1..=MAX_FEATURE_IDS_PER_REQUEST).contains(&self.batch_size) {
            return Err(format!(
                "batch size must be between 1 and {}, got {}",
                MAX_FEATURE_IDS_PER_REQUEST, self.batch_size
            ));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err("backoff multiplier must be at least 1.0".to_string());
        }
        if self.fallback.mode == FallbackMode::Dataset && self.fallback.dataset_path.is_none() {
            return Err("dataset fallback mode requires a dataset path".to_string());
        }
        if self.fallback.synthetic_rows == 0 {
            return Err("synthetic row count must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Retry behaviour for a failing feature batch.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Immediate retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FallbackSettings {
    pub mode: FallbackMode,
    pub dataset_path: Option<PathBuf>,
    pub synthetic_rows: usize,
    /// Fixed seed for reproducible synthetic tables.
    pub seed: Option<u64>,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            mode: FallbackMode::default(),
            dataset_path: None,
            synthetic_rows: 40,
            seed: None,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let defaults = PipelineSettings::default();

        // Credentials: each half may come from either layer
        let creds_file = file.credentials.unwrap_or_default();
        let client_id = creds_file.client_id.or_else(|| cli.client_id.clone());
        let client_secret = creds_file
            .client_secret
            .or_else(|| cli.client_secret.clone());
        let non_blank = |s: &String| !s.trim().is_empty();
        let credentials = match (client_id.filter(non_blank), client_secret.filter(non_blank)) {
            (Some(id), Some(secret)) => Some(Credentials::new(id, secret)),
            _ => None,
        };

        let raw_sources = file
            .source
            .and_then(|s| s.candidates)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| cli.sources.clone());
        let sources = if raw_sources.is_empty() {
            defaults.sources.clone()
        } else {
            raw_sources
                .iter()
                .map(|s| {
                    s.parse::<SourceCandidate>()
                        .map_err(|e| anyhow::anyhow!("Invalid source candidate {:?}: {}", s, e))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let pipeline_file = file.pipeline.unwrap_or_default();
        let row_order = match pipeline_file.row_order {
            Some(s) => parse_row_order(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid row_order in config file: {:?}", s))?,
            None => cli.row_order.unwrap_or(defaults.row_order),
        };

        let retry_defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: pipeline_file
                .max_retries
                .or(cli.max_retries)
                .unwrap_or(retry_defaults.max_retries),
            initial_backoff_ms: pipeline_file
                .initial_backoff_ms
                .unwrap_or(retry_defaults.initial_backoff_ms),
            max_backoff_ms: pipeline_file
                .max_backoff_ms
                .unwrap_or(retry_defaults.max_backoff_ms),
            backoff_multiplier: pipeline_file
                .backoff_multiplier
                .unwrap_or(retry_defaults.backoff_multiplier),
        };

        // Fallback settings - merge file config with defaults
        let fallback_file = file.fallback.unwrap_or_default();
        let fallback_defaults = FallbackSettings::default();
        let mode = match fallback_file.mode {
            Some(s) => parse_fallback_mode(&s)
                .ok_or_else(|| anyhow::anyhow!("Invalid fallback mode in config file: {:?}", s))?,
            None => cli.fallback_mode.unwrap_or(fallback_defaults.mode),
        };
        let fallback = FallbackSettings {
            mode,
            dataset_path: fallback_file
                .dataset_path
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
                .or_else(|| cli.dataset_path.clone()),
            synthetic_rows: fallback_file
                .synthetic_rows
                .or(cli.synthetic_rows)
                .unwrap_or(fallback_defaults.synthetic_rows),
            seed: fallback_file.seed.or(cli.seed),
        };

        let pipeline = PipelineSettings {
            credentials,
            sources,
            batch_size: pipeline_file
                .batch_size
                .or(cli.batch_size)
                .unwrap_or(defaults.batch_size),
            page_size: pipeline_file
                .page_size
                .or(cli.page_size)
                .unwrap_or(defaults.page_size),
            row_order,
            retry,
            cache_ttl_secs: pipeline_file
                .cache_ttl_secs
                .or(cli.cache_ttl_secs)
                .unwrap_or(defaults.cache_ttl_secs),
            fallback,
        };

        // Missing credentials are reported by the pipeline itself
        if let Err(reason) = pipeline.validate_settings() {
            bail!("Invalid configuration: {}", reason);
        }

        let api_file = file.api.unwrap_or_default();
        let client_defaults = ClientSettings::default();
        let client = ClientSettings {
            api_base_url: api_file
                .api_base_url
                .or_else(|| cli.api_base_url.clone())
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            token_url: api_file
                .token_url
                .or_else(|| cli.token_url.clone())
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            request_timeout: api_file
                .request_timeout_secs
                .or(cli.request_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(client_defaults.request_timeout),
            min_request_interval: api_file
                .min_request_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(client_defaults.min_request_interval),
        };
        if client.request_timeout.is_zero() {
            bail!("Invalid configuration: request timeout must be greater than zero");
        }

        Ok(Self { pipeline, client })
    }
}

/// Parses a row order string. Uses clap's ValueEnum trait for parsing.
fn parse_row_order(s: &str) -> Option<RowOrder> {
    RowOrder::from_str(s, true).ok()
}

fn parse_fallback_mode(s: &str) -> Option<FallbackMode> {
    FallbackMode::from_str(s, true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_credentials() -> CliConfig {
        CliConfig {
            client_id: Some("cli-id".to_string()),
            client_secret: Some("cli-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_row_order() {
        assert_eq!(parse_row_order("collection"), Some(RowOrder::Collection));
        assert_eq!(parse_row_order("Retrieval"), Some(RowOrder::Retrieval));
        assert!(parse_row_order("random").is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&cli_with_credentials(), None).unwrap();

        let pipeline = &config.pipeline;
        assert_eq!(pipeline.batch_size, 50);
        assert_eq!(pipeline.page_size, 80);
        assert_eq!(pipeline.row_order, RowOrder::Collection);
        assert_eq!(pipeline.cache_ttl_secs, 600);
        assert_eq!(pipeline.retry.max_retries, 1);
        assert_eq!(pipeline.fallback.mode, FallbackMode::Synthetic);
        assert_eq!(pipeline.fallback.synthetic_rows, 40);
        assert_eq!(
            pipeline.sources,
            vec![DEFAULT_SOURCE.parse::<SourceCandidate>().unwrap()]
        );
        assert_eq!(config.client.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.client.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            sources: vec!["cli-playlist".to_string()],
            batch_size: Some(20),
            page_size: Some(60),
            row_order: Some(RowOrder::Collection),
            ..cli_with_credentials()
        };
        let file_config = FileConfig {
            credentials: Some(CredentialsConfig {
                client_id: Some("toml-id".to_string()),
                client_secret: None,
            }),
            source: Some(SourceConfig {
                candidates: Some(vec!["search:deep house".to_string(), "pl-2".to_string()]),
            }),
            pipeline: Some(PipelineConfig {
                batch_size: Some(40),
                row_order: Some("retrieval".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();
        let pipeline = &config.pipeline;

        // TOML values should override CLI
        let credentials = pipeline.credentials.as_ref().unwrap();
        assert_eq!(credentials.client_id, "toml-id");
        assert_eq!(credentials.client_secret, "cli-secret");
        assert_eq!(
            pipeline.sources,
            vec![
                SourceCandidate::Search("deep house".to_string()),
                SourceCandidate::Collection("pl-2".to_string())
            ]
        );
        assert_eq!(pipeline.batch_size, 40);
        assert_eq!(pipeline.row_order, RowOrder::Retrieval);
        // CLI value used when TOML doesn't specify
        assert_eq!(pipeline.page_size, 60);
    }

    #[test]
    fn test_resolve_without_credentials_is_deferred() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();
        assert!(config.pipeline.credentials.is_none());
        assert!(config
            .pipeline
            .validate()
            .unwrap_err()
            .contains("credentials are missing"));
    }

    #[test]
    fn test_resolve_half_credentials_is_missing() {
        let cli = CliConfig {
            client_id: Some("only-id".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(config.pipeline.credentials.is_none());
    }

    #[test]
    fn test_resolve_rejects_batch_size_out_of_range() {
        for batch_size in [0, 101] {
            let cli = CliConfig {
                batch_size: Some(batch_size),
                ..cli_with_credentials()
            };
            let result = AppConfig::resolve(&cli, None);
            assert!(result.unwrap_err().to_string().contains("batch size"));
        }
    }

    #[test]
    fn test_resolve_rejects_page_size_out_of_range() {
        let cli = CliConfig {
            page_size: Some(150),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("page size"));
    }

    #[test]
    fn test_resolve_dataset_mode_requires_path() {
        let cli = CliConfig {
            fallback_mode: Some(FallbackMode::Dataset),
            ..cli_with_credentials()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("dataset path"));

        let cli = CliConfig {
            fallback_mode: Some(FallbackMode::Dataset),
            dataset_path: Some(PathBuf::from("ibiza_data.csv")),
            ..cli_with_credentials()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.pipeline.fallback.mode, FallbackMode::Dataset);
    }

    #[test]
    fn test_resolve_rejects_invalid_source() {
        let cli = CliConfig {
            sources: vec!["search:".to_string()],
            ..cli_with_credentials()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid source candidate"));
    }

    #[test]
    fn test_resolve_rejects_invalid_toml_enum() {
        let file_config = FileConfig {
            fallback: Some(FallbackConfig {
                mode: Some("imaginary".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli_with_credentials(), Some(file_config));
        assert!(result.unwrap_err().to_string().contains("fallback mode"));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = Credentials::new("id-123", "super-secret");
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("id-123"));
        assert!(!printed.contains("super-secret"));
    }
}
