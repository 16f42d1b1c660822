//! Joins items with their attributes into the output table.

use super::batcher::BatchOutcome;
use super::filter::FilteredItems;
use super::models::{AttributeSet, Item, ResultTable, Row, RowOrder, UNKNOWN_YEAR};

/// Upper bound applied to tempo before rounding.
pub const MAX_TEMPO: f64 = 300.0;

/// Emit one row per item that has attributes.
///
/// Items without attributes and attributes without a matching item are
/// skipped, so the table is never longer than either input.
pub fn assemble(items: &FilteredItems, outcome: &BatchOutcome, order: RowOrder) -> ResultTable {
    match order {
        RowOrder::Collection => items
            .items()
            .iter()
            .filter_map(|item| outcome.get(&item.id).map(|attrs| build_row(item, attrs)))
            .collect(),
        RowOrder::Retrieval => outcome
            .attributes()
            .iter()
            .filter_map(|attrs| items.get(&attrs.id).map(|item| build_row(item, attrs)))
            .collect(),
    }
}

pub fn build_row(item: &Item, attributes: &AttributeSet) -> Row {
    Row {
        id: item.id.clone(),
        track: item.name.clone(),
        artist: item.artist.clone(),
        popularity: item.popularity.min(100),
        year: item
            .year
            .clone()
            .unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
        bpm: bpm_from_tempo(attributes.tempo),
        energy: unit(attributes.energy),
        danceability: unit(attributes.danceability),
        valence: unit(attributes.valence),
        acousticness: unit(attributes.acousticness),
        loudness: finite_or_zero(attributes.loudness),
    }
}

/// Tempo rounded to the nearest integer after clamping to `[0, 300]`.
pub fn bpm_from_tempo(tempo: f64) -> u16 {
    if !tempo.is_finite() {
        return 0;
    }
    tempo.clamp(0.0, MAX_TEMPO).round() as u16
}

/// Finite value clamped to `[0, 1]`, zero otherwise.
pub(crate) fn unit(value: f64) -> f64 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
