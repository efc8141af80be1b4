use serde::{Deserialize, Serialize};

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Axis-aligned lat/lng rectangle. Used both for the scan region and for
/// viewport-scoped heatmap queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lng: (self.min_lng + self.max_lng) / 2.0,
        }
    }

    /// Grow the box outward by `fraction` of its own span on every side.
    /// Heatmap queries use this so markers just past the viewport edge
    /// still contribute to the rendered gradient.
    pub fn expand(&self, fraction: f64) -> BoundingBox {
        let lat_pad = (self.max_lat - self.min_lat) * fraction;
        let lng_pad = (self.max_lng - self.min_lng) * fraction;
        BoundingBox {
            min_lat: self.min_lat - lat_pad,
            max_lat: self.max_lat + lat_pad,
            min_lng: self.min_lng - lng_pad,
            max_lng: self.max_lng + lng_pad,
        }
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// One search cell: a circle of `radius_m` around `center`, tagged with its
/// subdivision depth. Depth 0 cells come straight from the grid partitioner;
/// deeper cells are children of saturated parents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub center: GeoPoint,
    pub radius_m: f64,
    pub depth: u8,
}

impl GeoCell {
    /// Stable provenance key for reviews discovered through this cell.
    pub fn key(&self) -> String {
        format!("d{}:{:.5}:{:.5}", self.depth, self.center.lat, self.center.lng)
    }
}

// --- Place Types ---

/// Stable place identity as issued by the places provider.
/// `Ord` matters: ranking ties are broken by ascending id, so the ordering
/// must be total and deterministic across runs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaceId(pub String);

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PlaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// What a single cell search returns per place, before review fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub id: PlaceId,
    pub name: String,
    pub location: GeoPoint,
}

/// Raw review text as returned by the review-fetch provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReview {
    pub text: String,
    pub language: Option<String>,
}

/// One place as discovered through one cell: summary plus its raw reviews,
/// carrying the cell key as provenance. Overlapping cells produce multiple
/// discoveries of the same place; the deduplicator folds them together.
#[derive(Debug, Clone)]
pub struct PlaceDiscovery {
    pub summary: PlaceSummary,
    pub reviews: Vec<RawReview>,
    pub cell_key: String,
}

/// A cleaned, deduplicated review attached to its canonical place.
/// Never mutated after dedup settles for the place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub place_id: PlaceId,
    pub text: String,
    pub language: Option<String>,
    pub cell_key: String,
}

/// Canonical merged record for one place. The first discovery fixes name and
/// location; later discoveries only contribute reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub id: PlaceId,
    pub name: String,
    pub location: GeoPoint,
    pub reviews: Vec<ReviewRecord>,
}

// --- Derived Types ---

/// Aggregate embedding for one place's reviews. A place with zero usable
/// reviews has no profile at all — absence is modeled by the surrounding
/// map/store, never by a zero vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticProfile {
    pub place_id: PlaceId,
    pub vector: Vec<f32>,
    pub review_count: usize,
}

/// One ranked hit for a query. Query-scoped and transient: a place has no
/// intrinsic similarity, so these are never cached keyed by place id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub place_id: PlaceId,
    pub name: String,
    pub location: GeoPoint,
    pub similarity: f32,
    pub weight: f32,
}
