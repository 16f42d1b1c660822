//! Batched audio-feature retrieval.
//!
//! Identifiers are split into contiguous groups, one request per group, issued
//! one after the other. A group that keeps failing is skipped so one bad batch
//! only costs its own rows.

use super::models::AttributeSet;
use super::PipelineError;
use crate::catalog_api::{ApiError, CatalogApi, RawAudioFeatures};
use crate::config::RetrySettings;
use crate::metrics;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Immediate retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// Cap for exponential growth and for provider-requested delays.
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            backoff_multiplier: settings.backoff_multiplier,
        }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// `initial_backoff * multiplier^retry_count`, capped at `max_backoff`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(i32::MAX as u32) as i32;
        let backoff =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::from_secs_f64(backoff.min(self.max_backoff.as_secs_f64()).max(0.0))
    }

    /// Delay before the next attempt. A provider `Retry-After` takes
    /// precedence but is still capped.
    pub fn delay_for(&self, error: &ApiError, retry_count: u32) -> Duration {
        match error.retry_after {
            Some(requested) => requested.min(self.max_backoff),
            None => self.backoff(retry_count),
        }
    }

    pub fn should_retry(&self, error: &ApiError, retry_count: u32) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}

/// Attributes gathered across all batches.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Retrieval order: batch order, then order within the batch.
    attributes: Vec<AttributeSet>,
    index: HashMap<String, usize>,
    pub batches_issued: usize,
    /// Zero-based indices of the batches that were skipped.
    pub failed_batches: Vec<usize>,
    pub last_error: Option<ApiError>,
}

impl BatchOutcome {
    pub fn attributes(&self) -> &[AttributeSet] {
        &self.attributes
    }

    pub fn get(&self, id: &str) -> Option<&AttributeSet> {
        self.index.get(id).map(|&position| &self.attributes[position])
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn succeeded_batches(&self) -> usize {
        self.batches_issued - self.failed_batches.len()
    }

    /// Describes skipped batches, if there were any.
    pub fn partial_failure(&self) -> Option<PipelineError> {
        if self.failed_batches.is_empty() {
            return None;
        }
        Some(PipelineError::PartialFetchFailure {
            failed_batches: self.failed_batches.clone(),
            total_batches: self.batches_issued,
        })
    }

    fn insert(&mut self, attributes: AttributeSet) {
        match self.index.get(&attributes.id) {
            Some(&position) => self.attributes[position] = attributes,
            None => {
                self.index
                    .insert(attributes.id.clone(), self.attributes.len());
                self.attributes.push(attributes);
            }
        }
    }
}

pub struct FeatureBatcher<'a, A: CatalogApi + ?Sized> {
    api: &'a A,
    batch_size: usize,
    policy: RetryPolicy,
}

impl<'a, A: CatalogApi + ?Sized> FeatureBatcher<'a, A> {
    pub fn new(api: &'a A, batch_size: usize, policy: RetryPolicy) -> Self {
        Self {
            api,
            batch_size: batch_size.max(1),
            policy,
        }
    }

    /// Fetch attributes for `ids`, one batch at a time.
    ///
    /// Fails only when no batch succeeded, or when the provider became
    /// unreachable before the first success. An empty input yields an empty
    /// outcome.
    pub fn fetch(&self, ids: &[String]) -> Result<BatchOutcome, PipelineError> {
        let mut outcome = BatchOutcome::default();

        for (batch_index, batch) in ids.chunks(self.batch_size).enumerate() {
            outcome.batches_issued += 1;

            match self.fetch_batch(batch_index, batch) {
                Ok(features) => {
                    metrics::record_feature_batch("ok");
                    let before = outcome.len();
                    for (position, raw) in features.into_iter().enumerate() {
                        if let Some(attributes) = to_attribute_set(raw, batch.get(position)) {
                            outcome.insert(attributes);
                        }
                    }
                    debug!(
                        "Batch {} returned {} of {} attribute sets",
                        batch_index,
                        outcome.len() - before,
                        batch.len()
                    );
                }
                Err(e) => {
                    metrics::record_feature_batch("failed");
                    warn!(
                        "Skipping feature batch {} ({} ids): {}",
                        batch_index,
                        batch.len(),
                        e
                    );
                    let connectivity_lost = e.kind.is_connectivity();
                    outcome.failed_batches.push(batch_index);
                    outcome.last_error = Some(e);

                    if connectivity_lost && outcome.succeeded_batches() == 0 {
                        return Err(total_failure(&outcome, ids.len(), self.batch_size));
                    }
                }
            }
        }

        if outcome.batches_issued > 0 && outcome.succeeded_batches() == 0 {
            return Err(total_failure(&outcome, ids.len(), self.batch_size));
        }

        Ok(outcome)
    }

    fn fetch_batch(
        &self,
        batch_index: usize,
        batch: &[String],
    ) -> Result<Vec<Option<RawAudioFeatures>>, ApiError> {
        let mut retry_count = 0;
        loop {
            match self.api.audio_features(batch) {
                Ok(features) => return Ok(features),
                Err(e) if self.policy.should_retry(&e, retry_count) => {
                    let delay = self.policy.delay_for(&e, retry_count);
                    debug!(
                        "Batch {} attempt {} failed ({}), retrying in {:?}",
                        batch_index,
                        retry_count + 1,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn total_failure(outcome: &BatchOutcome, total_ids: usize, batch_size: usize) -> PipelineError {
    PipelineError::TotalFetchFailure {
        failed_batches: outcome.failed_batches.len(),
        total_batches: total_ids.div_ceil(batch_size),
        last_error: outcome
            .last_error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default(),
    }
}

/// A null entry yields nothing; a missing id is taken from the request.
fn to_attribute_set(
    raw: Option<RawAudioFeatures>,
    requested_id: Option<&String>,
) -> Option<AttributeSet> {
    let raw = raw?;
    let id = raw
        .id
        .filter(|id| !id.is_empty())
        .or_else(|| requested_id.cloned())?;

    Some(AttributeSet {
        id,
        tempo: raw.tempo,
        energy: raw.energy,
        danceability: raw.danceability,
        loudness: raw.loudness,
        valence: raw.valence,
        acousticness: raw.acousticness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_api::{ApiErrorKind, MockCatalogApi};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ids(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("id-{:03}", i)).collect()
    }

    fn features_for(ids: &[String]) -> Vec<Option<RawAudioFeatures>> {
        ids.iter()
            .map(|id| {
                Some(RawAudioFeatures {
                    id: Some(id.clone()),
                    tempo: 124.0,
                    energy: 0.8,
                    danceability: 0.7,
                    loudness: -6.0,
                    valence: 0.5,
                    acousticness: 0.05,
                })
            })
            .collect()
    }

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            ..RetryPolicy::no_retry()
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        // 1600ms is capped
        assert_eq!(policy.backoff(4), Duration::from_millis(1000));
    }

    #[test]
    fn test_retry_after_is_honoured_but_capped() {
        let policy = RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        };

        let short = ApiError::new(ApiErrorKind::RateLimited, "slow down")
            .with_retry_after(Duration::from_secs(1));
        assert_eq!(policy.delay_for(&short, 0), Duration::from_secs(1));

        let long = ApiError::new(ApiErrorKind::RateLimited, "slow down")
            .with_retry_after(Duration::from_secs(60));
        assert_eq!(policy.delay_for(&long, 0), Duration::from_secs(2));
    }

    #[test]
    fn test_should_retry() {
        let policy = instant_policy(1);
        let status = ApiError::new(ApiErrorKind::Status, "502");
        let not_found = ApiError::new(ApiErrorKind::NotFound, "gone");

        assert!(policy.should_retry(&status, 0));
        assert!(!policy.should_retry(&status, 1));
        assert!(!policy.should_retry(&not_found, 0));
    }

    #[test]
    fn test_partitions_into_contiguous_batches() {
        let mut api = MockCatalogApi::new();
        let sizes = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorded = sizes.clone();
        api.expect_audio_features().times(3).returning(move |batch| {
            recorded.lock().unwrap().push(batch.len());
            Ok(features_for(batch))
        });

        let outcome = FeatureBatcher::new(&api, 50, instant_policy(0))
            .fetch(&ids(120))
            .unwrap();

        assert_eq!(*sizes.lock().unwrap(), vec![50, 50, 20]);
        assert_eq!(outcome.batches_issued, 3);
        assert_eq!(outcome.len(), 120);
        assert!(outcome.partial_failure().is_none());
    }

    #[test]
    fn test_failed_middle_batch_is_skipped() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features().returning(|batch| {
            if batch[0] == "id-050" {
                Err(ApiError::new(ApiErrorKind::Status, "502 Bad Gateway"))
            } else {
                Ok(features_for(batch))
            }
        });

        let all_ids = ids(120);
        let outcome = FeatureBatcher::new(&api, 50, instant_policy(1))
            .fetch(&all_ids)
            .unwrap();

        assert_eq!(outcome.len(), 70);
        assert_eq!(outcome.failed_batches, vec![1]);
        for id in &all_ids[0..50] {
            assert!(outcome.get(id).is_some());
        }
        for id in &all_ids[50..100] {
            assert!(outcome.get(id).is_none());
        }
        for id in &all_ids[100..120] {
            assert!(outcome.get(id).is_some());
        }
        assert!(matches!(
            outcome.partial_failure(),
            Some(PipelineError::PartialFetchFailure {
                total_batches: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_transient_failure_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut api = MockCatalogApi::new();
        api.expect_audio_features().returning(move |batch| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ApiError::new(ApiErrorKind::Timeout, "timed out"))
            } else {
                Ok(features_for(batch))
            }
        });

        let outcome = FeatureBatcher::new(&api, 50, instant_policy(1))
            .fetch(&ids(10))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.len(), 10);
        assert!(outcome.failed_batches.is_empty());
    }

    #[test]
    fn test_all_batches_failing_is_total_failure() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features()
            .times(3)
            .returning(|_| Err(ApiError::new(ApiErrorKind::Status, "500")));

        let error = FeatureBatcher::new(&api, 10, instant_policy(0))
            .fetch(&ids(25))
            .unwrap_err();

        match error {
            PipelineError::TotalFetchFailure {
                failed_batches,
                total_batches,
                last_error,
            } => {
                assert_eq!(failed_batches, 3);
                assert_eq!(total_batches, 3);
                assert!(last_error.contains("500"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_connectivity_loss_before_first_success_aborts() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features()
            .times(1)
            .returning(|_| Err(ApiError::new(ApiErrorKind::Connection, "network down")));

        let error = FeatureBatcher::new(&api, 10, instant_policy(0))
            .fetch(&ids(30))
            .unwrap_err();

        assert!(matches!(
            error,
            PipelineError::TotalFetchFailure {
                failed_batches: 1,
                total_batches: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_connectivity_loss_after_success_only_skips() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features().returning(|batch| {
            if batch[0] == "id-000" {
                Ok(features_for(batch))
            } else {
                Err(ApiError::new(ApiErrorKind::Connection, "network down"))
            }
        });

        let outcome = FeatureBatcher::new(&api, 10, instant_policy(0))
            .fetch(&ids(30))
            .unwrap();

        assert_eq!(outcome.len(), 10);
        assert_eq!(outcome.failed_batches, vec![1, 2]);
    }

    #[test]
    fn test_null_entries_dropped_and_missing_ids_positional() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features().returning(|_| {
            Ok(vec![
                None,
                Some(RawAudioFeatures {
                    id: None,
                    tempo: 128.0,
                    ..Default::default()
                }),
                Some(RawAudioFeatures {
                    id: Some("c".to_string()),
                    tempo: 90.0,
                    ..Default::default()
                }),
            ])
        });

        let request = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = FeatureBatcher::new(&api, 50, instant_policy(0))
            .fetch(&request)
            .unwrap();

        assert_eq!(outcome.len(), 2);
        assert!(outcome.get("a").is_none());
        assert_eq!(outcome.get("b").map(|a| a.tempo), Some(128.0));
        assert_eq!(outcome.attributes()[1].id, "c");
    }

    #[test]
    fn test_empty_input_issues_no_requests() {
        let mut api = MockCatalogApi::new();
        api.expect_audio_features().never();

        let outcome = FeatureBatcher::new(&api, 50, instant_policy(0))
            .fetch(&[])
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.batches_issued, 0);
    }
}
