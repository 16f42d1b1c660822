//! Data model shared by the pipeline stages.
//!
//! Everything here is created and discarded within a single pipeline
//! invocation and never mutated once built.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Source selection
// =============================================================================

/// One candidate the source resolver may try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCandidate {
    /// A fixed collection identifier.
    Collection(String),
    /// A free-text query, resolved to the first matching collection.
    Search(String),
}

impl SourceCandidate {
    const SEARCH_PREFIX: &'static str = "search:";
}

impl FromStr for SourceCandidate {
    type Err = String;

    /// Parses `search:<query>` as a search, anything else as an identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(query) = trimmed.strip_prefix(Self::SEARCH_PREFIX) {
            let query = query.trim();
            if query.is_empty() {
                return Err("search query cannot be empty".to_string());
            }
            return Ok(SourceCandidate::Search(query.to_string()));
        }
        if trimmed.is_empty() {
            return Err("collection identifier cannot be empty".to_string());
        }
        Ok(SourceCandidate::Collection(trimmed.to_string()))
    }
}

impl fmt::Display for SourceCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCandidate::Collection(id) => write!(f, "{}", id),
            SourceCandidate::Search(query) => write!(f, "{}{}", Self::SEARCH_PREFIX, query),
        }
    }
}

/// Identifier and display name of a resolved collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    pub id: String,
    pub name: String,
}

// =============================================================================
// Items and attributes
// =============================================================================

/// One usable track from the resolved collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub artist: String,
    /// Provider popularity, 0-100.
    pub popularity: u8,
    /// Four-digit release year, when the provider reports one.
    pub year: Option<String>,
}

/// Audio descriptors for one track.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSet {
    pub id: String,
    pub tempo: f64,
    pub energy: f64,
    pub danceability: f64,
    pub loudness: f64,
    pub valence: f64,
    pub acousticness: f64,
}

// =============================================================================
// Output table
// =============================================================================

/// Year value used when a track has no usable release date.
pub const UNKNOWN_YEAR: &str = "N/A";

/// One row of the output table. Column names match the dashboard dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "Id", default)]
    pub id: String,
    #[serde(rename = "Track")]
    pub track: String,
    #[serde(rename = "Artist")]
    pub artist: String,
    #[serde(rename = "Popularity")]
    pub popularity: u8,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "BPM")]
    pub bpm: u16,
    #[serde(rename = "Energy")]
    pub energy: f64,
    #[serde(rename = "Danceability")]
    pub danceability: f64,
    #[serde(rename = "Valence")]
    pub valence: f64,
    #[serde(rename = "Acousticness")]
    pub acousticness: f64,
    #[serde(rename = "Loudness", default)]
    pub loudness: f64,
}

/// Ordered rows produced by one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<Row>,
}

impl ResultTable {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl FromIterator<Row> for ResultTable {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Strategy parameters
// =============================================================================

/// Order of rows in the assembled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Order of the tracks in the source collection.
    #[default]
    Collection,
    /// Order in which attribute batches returned the tracks.
    Retrieval,
}

/// What the degradation switch substitutes when live data is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// The bundled literal table.
    Static,
    /// A CSV dataset on disk, falling through to the bundled table.
    Dataset,
    /// Procedurally generated rows.
    #[default]
    Synthetic,
}

// =============================================================================
// Provenance
// =============================================================================

/// Whether the rows came from the streaming API or from a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Live => "live",
            Provenance::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which fallback source produced a degraded table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackOrigin {
    Static,
    Dataset,
    Synthetic,
}

impl FallbackOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            FallbackOrigin::Static => "static",
            FallbackOrigin::Dataset => "dataset",
            FallbackOrigin::Synthetic => "synthetic",
        }
    }
}
