//! Reading and writing result tables.
//!
//! CSV uses the dashboard column names. JSON wraps the rows with the run's
//! provenance, collection and generation time.

use crate::pipeline::assembler::{bpm_from_tempo, finite_or_zero, unit};
use crate::pipeline::filter::release_year;
use crate::pipeline::{
    CollectionRef, FallbackOrigin, PipelineOutput, Provenance, ResultTable, Row, UNKNOWN_YEAR,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Write `table` as CSV with a header row.
pub fn write_csv_to<W: Write>(table: &ResultTable, writer: W) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);
    for row in table.iter() {
        writer.serialize(row).context("Failed to write CSV row")?;
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

pub fn write_csv(table: &ResultTable, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_csv_to(table, file)?;
    debug!("Wrote {} rows to {:?}", table.len(), path);
    Ok(())
}

/// A dataset line. Numbers are read leniently since offline datasets often
/// carry floats where the table has integers.
#[derive(Debug, Deserialize)]
struct DatasetRecord {
    #[serde(rename = "Id", default)]
    id: String,
    #[serde(rename = "Track")]
    track: String,
    #[serde(rename = "Artist")]
    artist: String,
    #[serde(rename = "Popularity", default)]
    popularity: f64,
    #[serde(rename = "Year", default)]
    year: String,
    #[serde(rename = "BPM")]
    bpm: f64,
    #[serde(rename = "Energy")]
    energy: f64,
    #[serde(rename = "Danceability")]
    danceability: f64,
    #[serde(rename = "Valence")]
    valence: f64,
    #[serde(rename = "Acousticness")]
    acousticness: f64,
    #[serde(rename = "Loudness", default)]
    loudness: f64,
}

impl DatasetRecord {
    fn into_row(self, line: usize) -> Row {
        let id = if self.id.trim().is_empty() {
            format!("row-{}", line)
        } else {
            self.id
        };
        let popularity = finite_or_zero(self.popularity).clamp(0.0, 100.0).round() as u8;

        Row {
            id,
            track: self.track,
            artist: self.artist,
            popularity,
            year: release_year(&self.year).unwrap_or_else(|| UNKNOWN_YEAR.to_string()),
            bpm: bpm_from_tempo(self.bpm),
            energy: unit(self.energy),
            danceability: unit(self.danceability),
            valence: unit(self.valence),
            acousticness: unit(self.acousticness),
            loudness: finite_or_zero(self.loudness),
        }
    }
}

/// Parse a CSV table. Lines that do not match the columns are skipped.
pub fn parse_csv<R: Read>(reader: R) -> Result<ResultTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Fail early on a file without the expected header
    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    for column in ["Track", "Artist", "BPM"] {
        if !headers.iter().any(|h| h == column) {
            anyhow::bail!("CSV is missing the {:?} column", column);
        }
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for (line, record) in reader.deserialize::<DatasetRecord>().enumerate() {
        match record {
            Ok(record) => rows.push(record.into_row(line + 1)),
            Err(e) => {
                skipped += 1;
                debug!("Skipping CSV line {}: {}", line + 2, e);
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {} malformed CSV lines", skipped);
    }

    Ok(ResultTable::new(rows))
}

pub fn read_csv(path: &Path) -> Result<ResultTable> {
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    parse_csv(file).with_context(|| format!("Failed to parse CSV file: {:?}", path))
}

/// JSON export document.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportDocument {
    pub provenance: Provenance,
    #[serde(default)]
    pub fallback_origin: Option<FallbackOrigin>,
    #[serde(default)]
    pub fallback_reason: Option<String>,
    #[serde(default)]
    pub collection: Option<CollectionRef>,
    pub generated_at: DateTime<Utc>,
    pub row_count: usize,
    pub rows: ResultTable,
}

impl ExportDocument {
    pub fn from_output(output: &PipelineOutput) -> Self {
        Self {
            provenance: output.provenance,
            fallback_origin: output.fallback.as_ref().map(|f| f.origin),
            fallback_reason: output.fallback.as_ref().map(|f| f.reason.clone()),
            collection: output.collection.clone(),
            generated_at: output.generated_at,
            row_count: output.table.len(),
            rows: output.table.clone(),
        }
    }
}

pub fn write_json_to<W: Write>(output: &PipelineOutput, writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, &ExportDocument::from_output(output))
        .context("Failed to serialize JSON export")
}

pub fn write_json(output: &PipelineOutput, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create JSON file: {:?}", path))?;
    write_json_to(output, file)?;
    debug!("Wrote JSON export to {:?}", path);
    Ok(())
}
