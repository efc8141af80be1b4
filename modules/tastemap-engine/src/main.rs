use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use embed_client::openai::OpenAiEmbedder;
use places_client::google::GooglePlacesClient;
use tastemap_common::Config;
use tastemap_engine::dedup::DiscoveryStore;
use tastemap_engine::grid::GridConfig;
use tastemap_engine::profile::build_profiles;
use tastemap_engine::scan::{ScanConfig, Scanner};
use tastemap_engine::store;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tastemap=info".parse()?))
        .init();

    info!("Tastemap scan starting...");

    // Load config
    let config = Config::scan_from_env();
    config.log_redacted();

    let places = Arc::new(GooglePlacesClient::new(
        &config.places_api_key,
        config.result_cap,
    ));
    let embedder = OpenAiEmbedder::new(&config.embed_api_key, &config.embed_model, config.embed_dim);

    // Resume from a previous pass when the places store already exists;
    // merge idempotence makes the rescan safe.
    let store = if Path::new(&config.places_csv).exists() {
        let records = store::load_places_csv(&config.places_csv)?;
        info!(places = records.len(), "Resuming from existing places store");
        Mutex::new(DiscoveryStore::from_records(records))
    } else {
        Mutex::new(DiscoveryStore::new())
    };

    let scanner = Scanner::new(
        places.clone(),
        places,
        ScanConfig {
            grid: GridConfig {
                cell_radius_m: config.cell_radius_m,
                overlap_fraction: config.overlap_fraction,
                max_depth: config.max_depth,
            },
            max_concurrent_cells: config.max_concurrent_cells,
            retry_attempts: 3,
            retry_base: Duration::from_secs(2),
        },
    );

    let stats = scanner.run(&config.region, &store).await?;

    let records = store.into_inner().into_records();
    store::save_places_csv(&config.places_csv, &records)?;

    // Encode semantic profiles for every place with usable reviews
    let (profiles, encode_gaps) = build_profiles(&records, &embedder).await?;
    let entries = store::profile_entries(&records, &profiles);
    store::save_profiles_json(&config.profiles_json, &entries)?;

    // Persist every gap from this pass; queries serve them as metadata
    let gaps: Vec<String> = stats
        .coverage_gaps
        .iter()
        .chain(&encode_gaps)
        .cloned()
        .collect();
    for gap in &gaps {
        warn!(gap = gap.as_str(), "Coverage gap");
    }
    store::save_gaps_json(&config.gaps_json, &gaps)?;

    info!(
        places = records.len(),
        profiles = entries.len(),
        cells_searched = stats.cells_searched,
        cells_split = stats.cells_split,
        gaps = gaps.len(),
        "Scan complete"
    );
    Ok(())
}
