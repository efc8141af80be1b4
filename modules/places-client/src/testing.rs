//! In-memory provider double for tests and offline runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use tastemap_common::{haversine_km, EngineError, GeoCell, PlaceId, PlaceSummary, RawReview};

use crate::{PlaceSearcher, ReviewFetcher, SearchPage};

/// A fixed universe of places. `search` returns every place whose location
/// falls inside the queried cell, reporting saturation when the hit count
/// reaches `result_cap` — the same signal the real provider gives.
pub struct StaticPlaces {
    places: Vec<PlaceSummary>,
    reviews: HashMap<PlaceId, Vec<RawReview>>,
    result_cap: usize,
    search_calls: Mutex<u32>,
}

impl StaticPlaces {
    pub fn new(result_cap: usize) -> Self {
        Self {
            places: Vec::new(),
            reviews: HashMap::new(),
            result_cap,
            search_calls: Mutex::new(0),
        }
    }

    pub fn with_place(mut self, summary: PlaceSummary, reviews: Vec<RawReview>) -> Self {
        self.reviews.insert(summary.id.clone(), reviews);
        self.places.push(summary);
        self
    }

    /// Number of `search` calls answered so far.
    pub fn search_calls(&self) -> u32 {
        *self.search_calls.lock().expect("search_calls lock")
    }
}

#[async_trait]
impl PlaceSearcher for StaticPlaces {
    async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError> {
        *self.search_calls.lock().expect("search_calls lock") += 1;

        let mut hits: Vec<PlaceSummary> = self
            .places
            .iter()
            .filter(|p| {
                let dist_m = haversine_km(
                    cell.center.lat,
                    cell.center.lng,
                    p.location.lat,
                    p.location.lng,
                ) * 1000.0;
                dist_m <= cell.radius_m
            })
            .cloned()
            .collect();
        hits.truncate(self.result_cap);

        let saturated = hits.len() >= self.result_cap;
        Ok(SearchPage { places: hits, saturated })
    }
}

#[async_trait]
impl ReviewFetcher for StaticPlaces {
    async fn fetch_reviews(&self, id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
        Ok(self.reviews.get(id).cloned().unwrap_or_default())
    }
}
