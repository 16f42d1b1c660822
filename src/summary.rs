//! Aggregations behind the dashboard charts.

use crate::pipeline::{ResultTable, Row, UNKNOWN_YEAR};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_BPM_BINS: usize = 30;
pub const TOP_ARTISTS: usize = 10;

/// Tracks whose title contains this are left out of the artist ranking.
const SESSION_MARKER: &str = "Session";

/// Split point for the mood map on both axes.
const MOOD_SPLIT: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Quadrant counts by valence (x) and energy (y).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoodQuadrants {
    /// Low valence, high energy.
    pub dark_energetic: usize,
    /// High valence, high energy.
    pub happy_energetic: usize,
    /// Low valence, low energy.
    pub sad_calm: usize,
    /// High valence, low energy.
    pub happy_calm: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttributeMeans {
    pub bpm: f64,
    pub energy: f64,
    pub danceability: f64,
    pub valence: f64,
    pub acousticness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub bpm_histogram: Vec<HistogramBin>,
    /// Year to track count, sorted by year.
    pub years: Vec<(String, usize)>,
    pub top_artists: Vec<(String, usize)>,
    pub mood: MoodQuadrants,
    pub means: AttributeMeans,
}

pub fn summarize(table: &ResultTable) -> TableSummary {
    summarize_with_bins(table, DEFAULT_BPM_BINS)
}

pub fn summarize_with_bins(table: &ResultTable, bpm_bins: usize) -> TableSummary {
    TableSummary {
        rows: table.len(),
        bpm_histogram: bpm_histogram(table, bpm_bins),
        years: year_distribution(table),
        top_artists: top_artists(table, TOP_ARTISTS),
        mood: mood_quadrants(table),
        means: attribute_means(table),
    }
}

/// Equal-width bins over `[min, max]` of the BPM column. The last bin is
/// closed on the right.
pub fn bpm_histogram(table: &ResultTable, bins: usize) -> Vec<HistogramBin> {
    let (min, max) = match (
        table.iter().map(|r| r.bpm).min(),
        table.iter().map(|r| r.bpm).max(),
    ) {
        (Some(min), Some(max)) => (min as f64, max as f64),
        _ => return Vec::new(),
    };

    let bins = bins.max(1);
    // A single value still gets a bin of width one
    let width = if max > min {
        (max - min) / bins as f64
    } else {
        1.0
    };
    let bins = if max > min { bins } else { 1 };

    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();

    for row in table.iter() {
        let position = ((row.bpm as f64 - min) / width).floor() as usize;
        histogram[position.min(bins - 1)].count += 1;
    }
    histogram
}

pub fn year_distribution(table: &ResultTable) -> Vec<(String, usize)> {
    let mut years: BTreeMap<&str, usize> = BTreeMap::new();
    for row in table.iter().filter(|r| r.year != UNKNOWN_YEAR) {
        *years.entry(row.year.as_str()).or_default() += 1;
    }
    years
        .into_iter()
        .map(|(year, count)| (year.to_string(), count))
        .collect()
}

/// Most frequent artists, excluding session tracks. Ties sort by name.
pub fn top_artists(table: &ResultTable, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for row in table.iter().filter(|r| !r.track.contains(SESSION_MARKER)) {
        *counts.entry(row.artist.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(artist, count)| (artist.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

pub fn mood_quadrants(table: &ResultTable) -> MoodQuadrants {
    let mut mood = MoodQuadrants::default();
    for row in table.iter() {
        let happy = row.valence >= MOOD_SPLIT;
        let energetic = row.energy >= MOOD_SPLIT;
        match (happy, energetic) {
            (false, true) => mood.dark_energetic += 1,
            (true, true) => mood.happy_energetic += 1,
            (false, false) => mood.sad_calm += 1,
            (true, false) => mood.happy_calm += 1,
        }
    }
    mood
}

pub fn attribute_means(table: &ResultTable) -> AttributeMeans {
    if table.is_empty() {
        return AttributeMeans::default();
    }
    let n = table.len() as f64;
    let mean = |f: fn(&Row) -> f64| table.iter().map(f).sum::<f64>() / n;

    AttributeMeans {
        bpm: mean(|r| r.bpm as f64),
        energy: mean(|r| r.energy),
        danceability: mean(|r| r.danceability),
        valence: mean(|r| r.valence),
        acousticness: mean(|r| r.acousticness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(track: &str, artist: &str, year: &str, bpm: u16, valence: f64, energy: f64) -> Row {
        Row {
            id: track.to_string(),
            track: track.to_string(),
            artist: artist.to_string(),
            popularity: 50,
            year: year.to_string(),
            bpm,
            energy,
            danceability: 0.6,
            valence,
            acousticness: 0.1,
            loudness: -6.0,
        }
    }

    fn table() -> ResultTable {
        ResultTable::new(vec![
            row("One", "Fisher", "2019", 120, 0.2, 0.9),
            row("Two", "Fisher", "2021", 125, 0.7, 0.8),
            row("Three", "Artbat", "2019", 130, 0.6, 0.3),
            row("Sunrise Session 1", "Session Crew", "N/A", 124, 0.4, 0.2),
            row("Sunrise Session 2", "Session Crew", "N/A", 126, 0.5, 0.5),
            row("Four", "Anyma", "2024", 130, 0.1, 0.1),
        ])
    }

    #[test]
    fn test_bpm_histogram() {
        let histogram = bpm_histogram(&table(), 5);

        assert_eq!(histogram.len(), 5);
        assert_eq!(histogram[0].lower, 120.0);
        assert_eq!(histogram[4].upper, 130.0);
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 6);
        // 130 lands in the last, right-closed bin
        assert_eq!(histogram[4].count, 2);
    }

    #[test]
    fn test_bpm_histogram_single_value_and_empty() {
        let single = ResultTable::new(vec![row("A", "B", "2020", 124, 0.5, 0.5)]);
        let histogram = bpm_histogram(&single, 30);
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].count, 1);

        assert!(bpm_histogram(&ResultTable::default(), 30).is_empty());
    }

    #[test]
    fn test_year_distribution_excludes_unknown() {
        assert_eq!(
            year_distribution(&table()),
            vec![
                ("2019".to_string(), 2),
                ("2021".to_string(), 1),
                ("2024".to_string(), 1)
            ]
        );
    }

    #[test]
    fn test_top_artists_skip_sessions_and_break_ties_by_name() {
        assert_eq!(
            top_artists(&table(), 10),
            vec![
                ("Fisher".to_string(), 2),
                ("Anyma".to_string(), 1),
                ("Artbat".to_string(), 1)
            ]
        );
        assert_eq!(top_artists(&table(), 1).len(), 1);
    }

    #[test]
    fn test_mood_quadrants() {
        let mood = mood_quadrants(&table());
        assert_eq!(
            mood,
            MoodQuadrants {
                dark_energetic: 1,
                happy_energetic: 2,
                sad_calm: 2,
                happy_calm: 1,
            }
        );
    }

    #[test]
    fn test_means() {
        let means = attribute_means(&table());
        assert!((means.bpm - 125.833).abs() < 0.001);
        assert!((means.danceability - 0.6).abs() < 1e-9);
        assert_eq!(attribute_means(&ResultTable::default()), AttributeMeans::default());
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&table());
        assert_eq!(summary.rows, 6);
        assert_eq!(summary.bpm_histogram.len(), DEFAULT_BPM_BINS);
        assert_eq!(summary.top_artists[0].0, "Fisher");
    }
}
