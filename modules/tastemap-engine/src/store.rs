//! Intermediate stores: places/reviews as row-oriented CSV, semantic
//! profiles as a JSON table keyed by place id with a fixed-width vector
//! column. Queries run against the profile table without re-encoding.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use tastemap_common::{EngineError, GeoPoint, PlaceId, PlaceRecord, ReviewRecord, SemanticProfile};

/// One row of the profile table: everything a query needs to rank and
/// render a place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub place_id: PlaceId,
    pub name: String,
    pub location: GeoPoint,
    pub vector: Vec<f32>,
    pub review_count: usize,
}

/// Join profiles with their canonical place records. Profiles without a
/// matching record are dropped (cannot be rendered without a location).
pub fn profile_entries(records: &[PlaceRecord], profiles: &[SemanticProfile]) -> Vec<ProfileEntry> {
    profiles
        .iter()
        .filter_map(|p| {
            let record = records.iter().find(|r| r.id == p.place_id)?;
            Some(ProfileEntry {
                place_id: p.place_id.clone(),
                name: record.name.clone(),
                location: record.location,
                vector: p.vector.clone(),
                review_count: p.review_count,
            })
        })
        .collect()
}

// --- Places CSV ---

/// One CSV row per (place, review). A review-less place still gets one row
/// with an empty `review_text` so the inventory survives a round trip.
#[derive(Debug, Serialize, Deserialize)]
struct PlaceRow {
    place_id: String,
    name: String,
    latitude: f64,
    longitude: f64,
    review_text: String,
    language: String,
    cell_key: String,
    fetched_at: String,
}

fn store_err(context: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::Store(format!("{context}: {e}"))
}

pub fn save_places_csv(path: impl AsRef<Path>, records: &[PlaceRecord]) -> Result<(), EngineError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| store_err("create places csv", e))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let fetched_at = Utc::now().to_rfc3339();

    let mut rows = 0usize;
    for record in records {
        if record.reviews.is_empty() {
            writer
                .serialize(PlaceRow {
                    place_id: record.id.to_string(),
                    name: record.name.clone(),
                    latitude: record.location.lat,
                    longitude: record.location.lng,
                    review_text: String::new(),
                    language: String::new(),
                    cell_key: String::new(),
                    fetched_at: fetched_at.clone(),
                })
                .map_err(|e| store_err("write places csv", e))?;
            rows += 1;
            continue;
        }
        for review in &record.reviews {
            writer
                .serialize(PlaceRow {
                    place_id: record.id.to_string(),
                    name: record.name.clone(),
                    latitude: record.location.lat,
                    longitude: record.location.lng,
                    review_text: review.text.clone(),
                    language: review.language.clone().unwrap_or_default(),
                    cell_key: review.cell_key.clone(),
                    fetched_at: fetched_at.clone(),
                })
                .map_err(|e| store_err("write places csv", e))?;
            rows += 1;
        }
    }
    writer.flush().map_err(|e| store_err("flush places csv", e))?;

    info!(path = %path.display(), places = records.len(), rows, "Saved places CSV");
    Ok(())
}

pub fn load_places_csv(path: impl AsRef<Path>) -> Result<Vec<PlaceRecord>, EngineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| store_err("open places csv", e))?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    let mut records: Vec<PlaceRecord> = Vec::new();
    let mut index: std::collections::HashMap<PlaceId, usize> = std::collections::HashMap::new();

    for row in reader.deserialize() {
        let row: PlaceRow = row.map_err(|e| store_err("read places csv", e))?;
        let id = PlaceId::new(row.place_id);
        let slot = *index.entry(id.clone()).or_insert_with(|| {
            records.push(PlaceRecord {
                id: id.clone(),
                name: row.name.clone(),
                location: GeoPoint {
                    lat: row.latitude,
                    lng: row.longitude,
                },
                reviews: Vec::new(),
            });
            records.len() - 1
        });
        if !row.review_text.is_empty() {
            records[slot].reviews.push(ReviewRecord {
                place_id: id,
                text: row.review_text,
                language: (!row.language.is_empty()).then_some(row.language),
                cell_key: row.cell_key,
            });
        }
    }

    info!(path = %path.display(), places = records.len(), "Loaded places CSV");
    Ok(records)
}

// --- Profiles JSON ---

pub fn save_profiles_json(
    path: impl AsRef<Path>,
    entries: &[ProfileEntry],
) -> Result<(), EngineError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| store_err("create profiles json", e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), entries)
        .map_err(|e| store_err("write profiles json", e))?;
    info!(path = %path.display(), profiles = entries.len(), "Saved profiles JSON");
    Ok(())
}

/// Load the profile table, validating every vector against the deployment
/// dimension. A mismatched width means the table was encoded under a
/// different model/config and must not be silently reused.
pub fn load_profiles_json(
    path: impl AsRef<Path>,
    expected_dim: usize,
) -> Result<Vec<ProfileEntry>, EngineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| store_err("open profiles json", e))?;
    let entries: Vec<ProfileEntry> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| store_err("parse profiles json", e))?;

    for entry in &entries {
        if entry.vector.len() != expected_dim {
            return Err(EngineError::DimensionMismatch {
                expected: expected_dim,
                actual: entry.vector.len(),
            });
        }
    }

    info!(path = %path.display(), profiles = entries.len(), "Loaded profiles JSON");
    Ok(entries)
}

// --- Coverage gaps ---

/// Persist the gap labels (`cell:...`, `place:...`) from a scan pass so the
/// query side can report them as metadata alongside best-effort results.
pub fn save_gaps_json(path: impl AsRef<Path>, gaps: &[String]) -> Result<(), EngineError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| store_err("create gaps json", e))?;
    serde_json::to_writer_pretty(BufWriter::new(file), gaps)
        .map_err(|e| store_err("write gaps json", e))?;
    info!(path = %path.display(), gaps = gaps.len(), "Saved coverage gaps");
    Ok(())
}

pub fn load_gaps_json(path: impl AsRef<Path>) -> Result<Vec<String>, EngineError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| store_err("open gaps json", e))?;
    let gaps: Vec<String> = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| store_err("parse gaps json", e))?;
    info!(path = %path.display(), gaps = gaps.len(), "Loaded coverage gaps");
    Ok(gaps)
}
