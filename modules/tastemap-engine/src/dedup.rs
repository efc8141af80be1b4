//! Place deduplication across overlapping cell discoveries.
//!
//! Overlapping cells rediscover the same place several times, each time with
//! the same (or partially the same) reviews. `DiscoveryStore` owns the
//! canonical mapping from place identity to merged record: the first
//! discovery fixes name and location, later ones can only contribute reviews.
//! A review is identified by (place id, cleaned text), which makes `merge`
//! idempotent — the property the scanner leans on for safe retries and
//! partial passes.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use tastemap_common::{PlaceDiscovery, PlaceId, PlaceRecord, ReviewRecord};

use crate::reviews;

/// Outcome of merging one discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First time this place identity was seen.
    Created { new_reviews: usize },
    /// Known place; only novel reviews were appended.
    Merged { new_reviews: usize },
}

/// Explicit owned discovery state, passed into the dedup step — never
/// ambient. The scanner serializes access behind a lock.
#[derive(Debug, Default)]
pub struct DiscoveryStore {
    places: HashMap<PlaceId, PlaceRecord>,
    seen_texts: HashMap<PlaceId, HashSet<String>>,
    fetched: HashSet<PlaceId>,
}

impl DiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get(&self, id: &PlaceId) -> Option<&PlaceRecord> {
        self.places.get(id)
    }

    /// Whether a review fetch is still owed for this place. Stays true until
    /// `mark_fetched` records a successful fetch, so a place merged after a
    /// transient fetch failure gets retried (and re-flagged) on the next
    /// pass instead of silently keeping zero reviews.
    pub fn needs_fetch(&self, id: &PlaceId) -> bool {
        !self.fetched.contains(id)
    }

    /// Record that this place's reviews were fetched successfully, even when
    /// the provider returned none.
    pub fn mark_fetched(&mut self, id: &PlaceId) {
        self.fetched.insert(id.clone());
    }

    /// Merge one cell discovery into the canonical state.
    pub fn merge(&mut self, discovery: PlaceDiscovery) -> MergeOutcome {
        let id = discovery.summary.id.clone();
        let created = !self.places.contains_key(&id);

        let record = self.places.entry(id.clone()).or_insert_with(|| PlaceRecord {
            id: id.clone(),
            name: discovery.summary.name.clone(),
            location: discovery.summary.location,
            reviews: Vec::new(),
        });
        let seen = self.seen_texts.entry(id.clone()).or_default();

        let mut new_reviews = 0;
        for raw in discovery.reviews {
            let cleaned = reviews::clean(&raw.text);
            if !reviews::is_usable(&cleaned) {
                debug!(place_id = %id, "Dropping review that cleaned to empty");
                continue;
            }
            if !seen.insert(cleaned.clone()) {
                continue;
            }
            record.reviews.push(ReviewRecord {
                place_id: id.clone(),
                text: cleaned,
                language: raw.language,
                cell_key: discovery.cell_key.clone(),
            });
            new_reviews += 1;
        }

        if created {
            MergeOutcome::Created { new_reviews }
        } else {
            MergeOutcome::Merged { new_reviews }
        }
    }

    /// All canonical records, ordered by ascending place id so downstream
    /// passes are deterministic.
    pub fn into_records(self) -> Vec<PlaceRecord> {
        let mut records: Vec<PlaceRecord> = self.places.into_values().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// Rebuild the store from persisted records (texts are already clean).
    pub fn from_records(records: Vec<PlaceRecord>) -> Self {
        let mut store = Self::new();
        for record in records {
            let seen = record.reviews.iter().map(|r| r.text.clone()).collect();
            store.seen_texts.insert(record.id.clone(), seen);
            // A persisted record with zero reviews cannot be told apart from
            // a recorded fetch gap, so it stays owed a fetch.
            if !record.reviews.is_empty() {
                store.fetched.insert(record.id.clone());
            }
            store.places.insert(record.id.clone(), record);
        }
        store
    }
}
