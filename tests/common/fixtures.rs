//! Builders for raw provider data and pipeline settings.

use super::constants::*;
use playlist_telemetry::catalog_api::{
    RawAlbum, RawArtist, RawAudioFeatures, RawEntry, RawTrack,
};
use playlist_telemetry::config::{Credentials, FallbackSettings, RetrySettings};
use playlist_telemetry::pipeline::SourceCandidate;
use playlist_telemetry::PipelineSettings;

/// Deterministic track id for position `index` of `collection`.
pub fn track_id(collection: &str, index: usize) -> String {
    format!("{}-t{:03}", collection, index)
}

pub fn raw_entry(id: &str, index: usize) -> RawEntry {
    RawEntry {
        track: Some(RawTrack {
            id: Some(id.to_string()),
            name: format!("Track {}", index + 1),
            artists: vec![RawArtist {
                name: format!("Artist {}", index % 4),
            }],
            popularity: Some((30 + index * 7 % 70) as u32),
            album: Some(RawAlbum {
                release_date: Some(format!("{}-05-01", 2015 + index % 10)),
            }),
            is_local: false,
        }),
        is_local: false,
    }
}

/// Features for `id`. Tempo sweeps past both ends of the valid range.
pub fn raw_features(id: &str, index: usize) -> RawAudioFeatures {
    RawAudioFeatures {
        id: Some(id.to_string()),
        tempo: -20.0 + (index as f64) * 37.3,
        energy: 0.5 + (index % 5) as f64 * 0.1,
        danceability: 0.6,
        loudness: -5.5,
        valence: (index % 10) as f64 / 10.0,
        acousticness: 0.05,
    }
}

/// Settings targeting `collection`, with instant retries and a seeded
/// synthetic fallback.
pub fn settings_for(collection: &str) -> PipelineSettings {
    PipelineSettings {
        credentials: Some(Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET)),
        sources: vec![SourceCandidate::Collection(collection.to_string())],
        retry: RetrySettings {
            max_retries: 1,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 1.0,
        },
        fallback: FallbackSettings {
            seed: Some(FALLBACK_SEED),
            ..Default::default()
        },
        ..Default::default()
    }
}
