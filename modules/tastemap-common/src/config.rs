use std::env;

use tracing::info;

use crate::types::BoundingBox;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Providers
    pub places_api_key: String,
    pub embed_api_key: String,
    pub embed_model: String,
    pub embed_dim: usize,

    // Scan region and grid
    pub region: BoundingBox,
    pub cell_radius_m: f64,
    pub overlap_fraction: f64,
    pub max_depth: u8,
    pub result_cap: usize,
    pub max_concurrent_cells: usize,

    // Intermediate stores
    pub places_csv: String,
    pub profiles_json: String,
    pub gaps_json: String,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration for the scan binary.
    /// Panics with a clear message if required vars are missing.
    pub fn scan_from_env() -> Self {
        Self {
            places_api_key: required_env("PLACES_API_KEY"),
            embed_api_key: required_env("EMBED_API_KEY"),
            embed_model: env_or("EMBED_MODEL", "text-embedding-3-small"),
            embed_dim: parsed_env("EMBED_DIM", 1536),
            region: region_from_env(),
            cell_radius_m: parsed_env("CELL_RADIUS_M", 600.0),
            overlap_fraction: check_overlap(
                "CELL_OVERLAP_FRACTION",
                parsed_env("CELL_OVERLAP_FRACTION", 0.15),
            ),
            max_depth: parsed_env("CELL_MAX_DEPTH", 4),
            result_cap: parsed_env("PROVIDER_RESULT_CAP", 20),
            max_concurrent_cells: parsed_env("MAX_CONCURRENT_CELLS", 4),
            places_csv: env_or("PLACES_CSV", "db_places.csv"),
            profiles_json: env_or("PROFILES_JSON", "profiles.json"),
            gaps_json: env_or("GAPS_JSON", "coverage_gaps.json"),
            web_host: env_or("WEB_HOST", "0.0.0.0"),
            web_port: parsed_env("WEB_PORT", 3000),
        }
    }

    /// Load a minimal config for the web server (reads stores, encodes
    /// queries, no places key needed).
    pub fn web_from_env() -> Self {
        Self {
            places_api_key: String::new(),
            embed_api_key: required_env("EMBED_API_KEY"),
            embed_model: env_or("EMBED_MODEL", "text-embedding-3-small"),
            embed_dim: parsed_env("EMBED_DIM", 1536),
            region: region_from_env(),
            cell_radius_m: parsed_env("CELL_RADIUS_M", 600.0),
            overlap_fraction: check_overlap(
                "CELL_OVERLAP_FRACTION",
                parsed_env("CELL_OVERLAP_FRACTION", 0.15),
            ),
            max_depth: parsed_env("CELL_MAX_DEPTH", 4),
            result_cap: parsed_env("PROVIDER_RESULT_CAP", 20),
            max_concurrent_cells: parsed_env("MAX_CONCURRENT_CELLS", 4),
            places_csv: env_or("PLACES_CSV", "db_places.csv"),
            profiles_json: env_or("PROFILES_JSON", "profiles.json"),
            gaps_json: env_or("GAPS_JSON", "coverage_gaps.json"),
            web_host: env_or("WEB_HOST", "0.0.0.0"),
            web_port: parsed_env("WEB_PORT", 3000),
        }
    }

    /// Log the non-secret parts of the config at startup.
    pub fn log_redacted(&self) {
        info!(
            min_lat = self.region.min_lat,
            max_lat = self.region.max_lat,
            min_lng = self.region.min_lng,
            max_lng = self.region.max_lng,
            cell_radius_m = self.cell_radius_m,
            overlap_fraction = self.overlap_fraction,
            max_depth = self.max_depth,
            result_cap = self.result_cap,
            embed_model = self.embed_model.as_str(),
            embed_dim = self.embed_dim,
            "Config loaded"
        );
    }
}

/// Region defaults cover central Strasbourg — the corpus the engine was
/// first built against. Override per deployment.
fn region_from_env() -> BoundingBox {
    BoundingBox {
        min_lat: parsed_env("REGION_MIN_LAT", 48.530),
        max_lat: parsed_env("REGION_MAX_LAT", 48.640),
        min_lng: parsed_env("REGION_MIN_LNG", 7.67),
        max_lng: parsed_env("REGION_MAX_LNG", 7.83),
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid number, got {raw}")),
        Err(_) => default,
    }
}

/// Cell spacing divides by `1 - overlap`, so a fraction at or above 1 would
/// stall the grid partitioner. Rejected at load time.
fn check_overlap(key: &str, value: f64) -> f64 {
    if !(0.0..1.0).contains(&value) {
        panic!("{key} must be in [0, 1), got {value}");
    }
    value
}
