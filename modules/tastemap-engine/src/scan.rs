//! Scan orchestrator: drives cell search, adaptive subdivision, review
//! fetch, and dedup merge.
//!
//! Cells are processed through an explicit work queue of depth-tagged tasks
//! (never unbounded recursion), with a semaphore bounding concurrent
//! provider calls. The `DiscoveryStore` is the single synchronization point:
//! concurrent cells race to discover the same place and merges serialize
//! behind its lock. Merge idempotence makes a partially-completed or aborted
//! pass safe to keep and resume.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use places_client::{PlaceSearcher, ReviewFetcher};
use tastemap_common::{BoundingBox, EngineError, GeoCell, PlaceDiscovery};

use crate::dedup::DiscoveryStore;
use crate::grid::{partition, subdivide, GridConfig};
use crate::retry::with_backoff;

#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub grid: GridConfig,
    pub max_concurrent_cells: usize,
    pub retry_attempts: u32,
    pub retry_base: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig {
                cell_radius_m: 600.0,
                overlap_fraction: 0.15,
                max_depth: 4,
            },
            max_concurrent_cells: 4,
            retry_attempts: 3,
            retry_base: Duration::from_secs(2),
        }
    }
}

/// Outcome counters for one scan pass. `coverage_gaps` lists every unit that
/// was skipped or left possibly incomplete — queries against the corpus stay
/// best-effort and report these as metadata.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub cells_searched: u32,
    pub cells_split: u32,
    pub cells_failed: u32,
    pub places_discovered: usize,
    pub reviews_kept: usize,
    pub coverage_gaps: Vec<String>,
}

struct CellReport {
    children: Vec<GeoCell>,
    split: bool,
    failed: bool,
    new_places: usize,
    new_reviews: usize,
    gaps: Vec<String>,
}

pub struct Scanner {
    searcher: Arc<dyn PlaceSearcher>,
    fetcher: Arc<dyn ReviewFetcher>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        searcher: Arc<dyn PlaceSearcher>,
        fetcher: Arc<dyn ReviewFetcher>,
        config: ScanConfig,
    ) -> Self {
        Self {
            searcher,
            fetcher,
            config,
        }
    }

    /// Run one full discovery pass over `region`, merging into `store`.
    pub async fn run(
        &self,
        region: &BoundingBox,
        store: &Mutex<DiscoveryStore>,
    ) -> Result<ScanStats, EngineError> {
        let mut queue: VecDeque<GeoCell> = partition(region, &self.config.grid).into();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_cells));
        let mut stats = ScanStats::default();

        info!(top_cells = queue.len(), "Starting scan pass");

        while !queue.is_empty() {
            let wave: Vec<GeoCell> = queue.drain(..).collect();
            let reports = futures::future::join_all(wave.into_iter().map(|cell| {
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore
                        .acquire()
                        .await
                        .map_err(|_| EngineError::Config("scan semaphore closed".into()))?;
                    self.process_cell(cell, store).await
                }
            }))
            .await;

            for report in reports {
                let report = report?;
                stats.cells_searched += 1;
                if report.split {
                    stats.cells_split += 1;
                }
                if report.failed {
                    stats.cells_failed += 1;
                }
                stats.places_discovered += report.new_places;
                stats.reviews_kept += report.new_reviews;
                stats.coverage_gaps.extend(report.gaps);
                queue.extend(report.children);
            }
        }

        info!(
            cells_searched = stats.cells_searched,
            cells_split = stats.cells_split,
            cells_failed = stats.cells_failed,
            places = stats.places_discovered,
            reviews = stats.reviews_kept,
            gaps = stats.coverage_gaps.len(),
            "Scan pass complete"
        );
        Ok(stats)
    }

    async fn process_cell(
        &self,
        cell: GeoCell,
        store: &Mutex<DiscoveryStore>,
    ) -> Result<CellReport, EngineError> {
        let mut report = CellReport {
            children: Vec::new(),
            split: false,
            failed: false,
            new_places: 0,
            new_reviews: 0,
            gaps: Vec::new(),
        };
        let key = cell.key();

        let page = match with_backoff(
            || self.searcher.search(&cell),
            self.config.retry_attempts,
            self.config.retry_base,
            &key,
        )
        .await
        {
            Ok(page) => page,
            Err(e) if e.is_transient() => {
                warn!(cell = %key, error = %e, "Cell search failed, flagging coverage gap");
                report.failed = true;
                report.gaps.push(format!("cell:{key}"));
                return Ok(report);
            }
            // Auth/quota and config inconsistencies abort the run
            Err(e) => return Err(e),
        };

        if page.saturated {
            if cell.depth < self.config.grid.max_depth {
                report.children = subdivide(&cell).to_vec();
                report.split = true;
                info!(cell = %key, "Cell saturated, subdividing");
            } else {
                warn!(cell = %key, "Cell saturated at max depth, possibly incomplete");
                report.gaps.push(format!("cell:{key} (max depth, possibly incomplete)"));
            }
        }

        // Saturated parents are still merged: their results are valid
        // discoveries, the children only add what the cap hid.
        for summary in page.places {
            // Fetch until a fetch has succeeded, not merely until the place
            // is known: a place whose fetch failed transiently last time is
            // still owed its reviews and must be re-flagged if it fails
            // again.
            let needs_fetch = store.lock().await.needs_fetch(&summary.id);
            let reviews = if needs_fetch {
                match with_backoff(
                    || self.fetcher.fetch_reviews(&summary.id),
                    self.config.retry_attempts,
                    self.config.retry_base,
                    summary.id.0.as_str(),
                )
                .await
                {
                    Ok(reviews) => {
                        store.lock().await.mark_fetched(&summary.id);
                        reviews
                    }
                    Err(e) if e.is_transient() => {
                        warn!(place_id = %summary.id, error = %e, "Review fetch failed, flagging gap");
                        report.gaps.push(format!("place:{}", summary.id));
                        Vec::new()
                    }
                    Err(e) => return Err(e),
                }
            } else {
                Vec::new()
            };

            let outcome = store.lock().await.merge(PlaceDiscovery {
                summary,
                reviews,
                cell_key: key.clone(),
            });
            match outcome {
                crate::dedup::MergeOutcome::Created { new_reviews } => {
                    report.new_places += 1;
                    report.new_reviews += new_reviews;
                }
                crate::dedup::MergeOutcome::Merged { new_reviews } => {
                    report.new_reviews += new_reviews;
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use places_client::{testing::StaticPlaces, SearchPage};
    use tastemap_common::{GeoPoint, PlaceId, PlaceSummary, RawReview};

    fn point_region() -> BoundingBox {
        BoundingBox {
            min_lat: 48.58,
            max_lat: 48.58,
            min_lng: 7.75,
            max_lng: 7.75,
        }
    }

    fn summary(id: &str, lat: f64, lng: f64) -> PlaceSummary {
        PlaceSummary {
            id: PlaceId::new(id),
            name: format!("Place {id}"),
            location: GeoPoint { lat, lng },
        }
    }

    fn review(text: &str) -> RawReview {
        RawReview {
            text: text.to_string(),
            language: None,
        }
    }

    fn quick_config() -> ScanConfig {
        ScanConfig {
            retry_attempts: 2,
            retry_base: Duration::from_millis(1),
            ..ScanConfig::default()
        }
    }

    #[tokio::test]
    async fn scan_discovers_and_merges_places() {
        let provider = Arc::new(
            StaticPlaces::new(20)
                .with_place(summary("P1", 48.58, 7.75), vec![review("Cozy spot")])
                .with_place(summary("P2", 48.5803, 7.7504), vec![review("Great pasta 🍝")]),
        );
        let scanner = Scanner::new(provider.clone(), provider, quick_config());
        let store = Mutex::new(DiscoveryStore::new());

        let stats = scanner.run(&point_region(), &store).await.unwrap();
        assert_eq!(stats.places_discovered, 2);
        assert_eq!(stats.reviews_kept, 2);
        assert!(stats.coverage_gaps.is_empty());

        let records = store.into_inner().into_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reviews[0].text, "cozy spot");
    }

    #[tokio::test]
    async fn rescan_is_idempotent() {
        let provider = Arc::new(
            StaticPlaces::new(20).with_place(summary("P1", 48.58, 7.75), vec![review("Cozy spot")]),
        );
        let scanner = Scanner::new(provider.clone(), provider, quick_config());
        let store = Mutex::new(DiscoveryStore::new());

        scanner.run(&point_region(), &store).await.unwrap();
        let stats = scanner.run(&point_region(), &store).await.unwrap();

        // Second pass rediscovers but merges nothing new
        assert_eq!(stats.places_discovered, 0);
        assert_eq!(stats.reviews_kept, 0);
        assert_eq!(store.lock().await.len(), 1);
    }

    /// Saturates at depth 0 and returns distinct places from the children.
    struct SaturatingSearcher;

    #[async_trait]
    impl PlaceSearcher for SaturatingSearcher {
        async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError> {
            if cell.depth == 0 {
                Ok(SearchPage {
                    places: vec![summary("P1", cell.center.lat, cell.center.lng)],
                    saturated: true,
                })
            } else {
                Ok(SearchPage {
                    places: vec![summary(
                        &format!("C-{}", cell.key()),
                        cell.center.lat,
                        cell.center.lng,
                    )],
                    saturated: false,
                })
            }
        }
    }

    #[async_trait]
    impl ReviewFetcher for SaturatingSearcher {
        async fn fetch_reviews(&self, _id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
            Ok(vec![review("fine")])
        }
    }

    #[tokio::test]
    async fn saturated_cell_is_subdivided() {
        let provider = Arc::new(SaturatingSearcher);
        let mut config = quick_config();
        config.grid.max_depth = 1;
        let scanner = Scanner::new(provider.clone(), provider, config);
        let store = Mutex::new(DiscoveryStore::new());

        let stats = scanner.run(&point_region(), &store).await.unwrap();
        assert_eq!(stats.cells_split, 1);
        // 1 parent + 4 children
        assert_eq!(stats.cells_searched, 5);
        // Parent result is kept alongside the children's
        assert_eq!(store.lock().await.len(), 5);
        assert!(stats.coverage_gaps.is_empty());
    }

    /// Saturated at every depth — must bottom out at max_depth with a gap.
    struct AlwaysSaturated;

    #[async_trait]
    impl PlaceSearcher for AlwaysSaturated {
        async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError> {
            Ok(SearchPage {
                places: vec![summary(
                    &format!("S-{}", cell.key()),
                    cell.center.lat,
                    cell.center.lng,
                )],
                saturated: true,
            })
        }
    }

    #[async_trait]
    impl ReviewFetcher for AlwaysSaturated {
        async fn fetch_reviews(&self, _id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn max_depth_cells_are_flagged_not_dropped() {
        let provider = Arc::new(AlwaysSaturated);
        let mut config = quick_config();
        config.grid.max_depth = 1;
        let scanner = Scanner::new(provider.clone(), provider, config);
        let store = Mutex::new(DiscoveryStore::new());

        let stats = scanner.run(&point_region(), &store).await.unwrap();
        // Depth bound terminates the queue: 1 parent + 4 leaves
        assert_eq!(stats.cells_searched, 5);
        assert_eq!(stats.cells_split, 1);
        // Each max-depth leaf is flagged possibly incomplete
        assert_eq!(stats.coverage_gaps.len(), 4);
        // Leaf results were still merged
        assert_eq!(store.lock().await.len(), 5);
    }

    /// Search always works; review fetch fails transiently until the
    /// provider is marked healthy.
    struct RecoveringReviews {
        healthy: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PlaceSearcher for RecoveringReviews {
        async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError> {
            Ok(SearchPage {
                places: vec![summary("P1", cell.center.lat, cell.center.lng)],
                saturated: false,
            })
        }
    }

    #[async_trait]
    impl ReviewFetcher for RecoveringReviews {
        async fn fetch_reviews(&self, _id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
            if self.healthy.load(std::sync::atomic::Ordering::SeqCst) {
                Ok(vec![review("Cozy spot")])
            } else {
                Err(EngineError::ProviderTransient("timeout".into()))
            }
        }
    }

    #[tokio::test]
    async fn resumed_pass_retries_failed_review_fetch() {
        let provider = Arc::new(RecoveringReviews {
            healthy: std::sync::atomic::AtomicBool::new(false),
        });
        let scanner = Scanner::new(provider.clone(), provider.clone(), quick_config());
        let store = Mutex::new(DiscoveryStore::new());

        let first = scanner.run(&point_region(), &store).await.unwrap();
        assert_eq!(first.coverage_gaps, vec!["place:P1".to_string()]);
        assert!(store.lock().await.get(&PlaceId::new("P1")).unwrap().reviews.is_empty());

        provider
            .healthy
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let second = scanner.run(&point_region(), &store).await.unwrap();
        assert!(second.coverage_gaps.is_empty());
        assert_eq!(second.reviews_kept, 1);
        assert_eq!(
            store.lock().await.get(&PlaceId::new("P1")).unwrap().reviews[0].text,
            "cozy spot"
        );
    }

    /// Always fails with a transient error.
    struct DownSearcher;

    #[async_trait]
    impl PlaceSearcher for DownSearcher {
        async fn search(&self, _cell: &GeoCell) -> Result<SearchPage, EngineError> {
            Err(EngineError::ProviderTransient("connection reset".into()))
        }
    }

    #[async_trait]
    impl ReviewFetcher for DownSearcher {
        async fn fetch_reviews(&self, _id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn transient_search_failure_becomes_coverage_gap() {
        let provider = Arc::new(DownSearcher);
        let scanner = Scanner::new(provider.clone(), provider, quick_config());
        let store = Mutex::new(DiscoveryStore::new());

        let stats = scanner.run(&point_region(), &store).await.unwrap();
        assert_eq!(stats.cells_failed, 1);
        assert_eq!(stats.coverage_gaps.len(), 1);
        assert!(stats.coverage_gaps[0].starts_with("cell:"));
        assert!(store.lock().await.is_empty());
    }

    /// Rejects every call outright.
    struct RevokedSearcher;

    #[async_trait]
    impl PlaceSearcher for RevokedSearcher {
        async fn search(&self, _cell: &GeoCell) -> Result<SearchPage, EngineError> {
            Err(EngineError::ProviderPermanent("API key revoked".into()))
        }
    }

    #[async_trait]
    impl ReviewFetcher for RevokedSearcher {
        async fn fetch_reviews(&self, _id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn permanent_provider_error_aborts_the_run() {
        let provider = Arc::new(RevokedSearcher);
        let scanner = Scanner::new(provider.clone(), provider, quick_config());
        let store = Mutex::new(DiscoveryStore::new());

        let err = scanner.run(&point_region(), &store).await.unwrap_err();
        assert!(!err.is_transient());
    }
}
