//! Tables used when live data is unavailable.
//!
//! Every builder here returns a non-empty table. The chain is
//! dataset -> bundled -> synthetic, entered at the configured mode.

use super::models::{FallbackMode, FallbackOrigin, ResultTable, Row, UNKNOWN_YEAR};
use crate::config::FallbackSettings;
use crate::export;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::path::Path;
use tracing::{debug, warn};

const BUNDLED_TABLE: &str = include_str!("../../assets/fallback_tracks.csv");

// Synthetic value ranges. Placeholders tuned to look like a house/dance
// playlist, not derived from real data.
const SYNTH_BPM: (f64, f64) = (118.0, 132.0);
const SYNTH_ENERGY: (f64, f64) = (0.5, 0.9);
const SYNTH_DANCEABILITY: (f64, f64) = (0.55, 0.9);
const SYNTH_VALENCE: (f64, f64) = (0.2, 0.8);
const SYNTH_ACOUSTICNESS: (f64, f64) = (0.0, 0.3);
const SYNTH_LOUDNESS: (f64, f64) = (-9.0, -4.0);
const SYNTH_POPULARITY_MEAN: f64 = 55.0;
const SYNTH_POPULARITY_STD_DEV: f64 = 18.0;
const SYNTH_YEARS: (u16, u16) = (2012, 2025);
const SYNTH_UNKNOWN_YEAR_P: f64 = 0.1;
const SYNTH_SESSION_P: f64 = 0.15;

const SYNTH_ARTISTS: &[&str] = &[
    "Solomun",
    "Black Coffee",
    "Peggy Gou",
    "Fisher",
    "Chris Lake",
    "Keinemusik",
    "Vintage Culture",
    "Anyma",
    "Mochakk",
    "Honey Dijon",
    "Dixon",
    "Jamie Jones",
];

const SYNTH_WORDS: &[&str] = &[
    "Sunset", "Balearic", "Afterglow", "Terrace", "Horizon", "Salt", "Midnight", "Pulse",
    "Coastline", "Neon", "Shelter", "Drift", "Riviera", "Tide", "Glow", "Motion",
];

/// A substitute table and where it came from.
#[derive(Debug, Clone)]
pub struct FallbackTable {
    pub origin: FallbackOrigin,
    pub table: ResultTable,
}

/// Build the substitute table for `settings`, falling through to the next
/// source when one yields nothing.
pub fn build_fallback(settings: &FallbackSettings) -> FallbackTable {
    if settings.mode == FallbackMode::Dataset {
        match settings.dataset_path.as_deref().map(dataset_table) {
            Some(Some(table)) => {
                return FallbackTable {
                    origin: FallbackOrigin::Dataset,
                    table,
                }
            }
            Some(None) => warn!("Offline dataset unusable, using bundled table"),
            None => warn!("No offline dataset configured, using bundled table"),
        }
    }

    if matches!(settings.mode, FallbackMode::Dataset | FallbackMode::Static) {
        match bundled_table() {
            Some(table) => {
                return FallbackTable {
                    origin: FallbackOrigin::Static,
                    table,
                }
            }
            None => warn!("Bundled table unusable, generating synthetic rows"),
        }
    }

    FallbackTable {
        origin: FallbackOrigin::Synthetic,
        table: synthetic_table(settings.synthetic_rows, settings.seed),
    }
}

/// Rows of an offline CSV dataset, or `None` if it cannot be read or is empty.
pub fn dataset_table(path: &Path) -> Option<ResultTable> {
    match export::read_csv(path) {
        Ok(table) if !table.is_empty() => {
            debug!("Loaded {} rows from dataset {:?}", table.len(), path);
            Some(table)
        }
        Ok(_) => {
            warn!("Dataset {:?} contains no rows", path);
            None
        }
        Err(e) => {
            warn!("Failed to load dataset {:?}: {:#}", path, e);
            None
        }
    }
}

/// The table compiled into the binary.
pub fn bundled_table() -> Option<ResultTable> {
    match export::parse_csv(BUNDLED_TABLE.as_bytes()) {
        Ok(table) if !table.is_empty() => Some(table),
        Ok(_) => None,
        Err(e) => {
            warn!("Failed to parse bundled table: {:#}", e);
            None
        }
    }
}

/// Generate `rows` plausible rows (at least one). A seed makes the output
/// reproducible.
pub fn synthetic_table(rows: usize, seed: Option<u64>) -> ResultTable {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let popularity = Normal::new(SYNTH_POPULARITY_MEAN, SYNTH_POPULARITY_STD_DEV).ok();

    (0..rows.max(1))
        .map(|i| synthetic_row(&mut rng, popularity.as_ref(), i))
        .collect()
}

fn synthetic_row(rng: &mut StdRng, popularity: Option<&Normal<f64>>, index: usize) -> Row {
    let session = rng.random_bool(SYNTH_SESSION_P);
    let (track, artist) = if session {
        (
            format!("Ibiza Session {}", index + 1),
            "Session Crew".to_string(),
        )
    } else {
        let first = SYNTH_WORDS[rng.random_range(0..SYNTH_WORDS.len())];
        let second = SYNTH_WORDS[rng.random_range(0..SYNTH_WORDS.len())];
        (
            format!("{} {}", first, second),
            SYNTH_ARTISTS[rng.random_range(0..SYNTH_ARTISTS.len())].to_string(),
        )
    };

    let popularity = match popularity {
        Some(dist) => dist.sample(rng),
        None => SYNTH_POPULARITY_MEAN,
    };
    let popularity = popularity.clamp(0.0, 100.0).round() as u8;
    let year = if rng.random_bool(SYNTH_UNKNOWN_YEAR_P) {
        UNKNOWN_YEAR.to_string()
    } else {
        rng.random_range(SYNTH_YEARS.0..=SYNTH_YEARS.1).to_string()
    };

    Row {
        id: format!("synthetic-{:03}", index + 1),
        track,
        artist,
        popularity,
        year,
        bpm: rng.random_range(SYNTH_BPM.0..=SYNTH_BPM.1).round() as u16,
        energy: round3(rng.random_range(SYNTH_ENERGY.0..=SYNTH_ENERGY.1)),
        danceability: round3(rng.random_range(SYNTH_DANCEABILITY.0..=SYNTH_DANCEABILITY.1)),
        valence: round3(rng.random_range(SYNTH_VALENCE.0..=SYNTH_VALENCE.1)),
        acousticness: round3(rng.random_range(SYNTH_ACOUSTICNESS.0..=SYNTH_ACOUSTICNESS.1)),
        loudness: round3(rng.random_range(SYNTH_LOUDNESS.0..=SYNTH_LOUDNESS.1)),
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
