//! Places-search and review-fetch provider.
//!
//! The engine only depends on the two traits here; the Google Places v1
//! client is the production implementation and `testing::StaticPlaces` is the
//! in-memory double used across the workspace's tests.

pub mod google;
pub mod testing;

use async_trait::async_trait;

use tastemap_common::{EngineError, GeoCell, PlaceId, PlaceSummary, RawReview};

/// One provider answer for one cell. `saturated` means the provider returned
/// at least its per-query result cap, i.e. coverage of the cell may be
/// incomplete and the caller should subdivide.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub places: Vec<PlaceSummary>,
    pub saturated: bool,
}

#[async_trait]
pub trait PlaceSearcher: Send + Sync {
    async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError>;
}

#[async_trait]
pub trait ReviewFetcher: Send + Sync {
    async fn fetch_reviews(&self, id: &PlaceId) -> Result<Vec<RawReview>, EngineError>;
}

pub use google::GooglePlacesClient;
