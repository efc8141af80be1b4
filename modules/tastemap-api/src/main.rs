//! Query-side HTTP server: similarity search and heatmap endpoints over the
//! stores produced by `tastemap-scan`. The profile table is loaded once at
//! startup; only the query itself is encoded per request.

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use embed_client::{Embedder, OpenAiEmbedder};
use tastemap_common::Config;
use tastemap_engine::heatmap::WeightTransform;
use tastemap_engine::scorer::RescalePolicy;
use tastemap_engine::store::{self, ProfileEntry};

mod rest;

// --- App State ---

pub struct AppState {
    pub entries: Vec<ProfileEntry>,
    pub inventory: Vec<rest::RestaurantView>,
    pub coverage_gaps: Vec<String>,
    pub embedder: Arc<dyn Embedder>,
    pub policy: RescalePolicy,
    pub transform: WeightTransform,
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tastemap=info".parse()?))
        .init();

    let config = Config::web_from_env();
    config.log_redacted();

    let records = store::load_places_csv(&config.places_csv)?;
    let entries = store::load_profiles_json(&config.profiles_json, config.embed_dim)?;
    // Gap metadata is optional: stores written before any gap was recorded
    // simply have none.
    let coverage_gaps = if std::path::Path::new(&config.gaps_json).exists() {
        store::load_gaps_json(&config.gaps_json)?
    } else {
        Vec::new()
    };
    info!(
        places = records.len(),
        profiles = entries.len(),
        gaps = coverage_gaps.len(),
        "Stores loaded"
    );

    let state = Arc::new(AppState {
        inventory: rest::inventory_views(&records),
        entries,
        coverage_gaps,
        embedder: Arc::new(OpenAiEmbedder::new(
            &config.embed_api_key,
            &config.embed_model,
            config.embed_dim,
        )),
        policy: RescalePolicy::default(),
        transform: WeightTransform::default(),
    });

    let app = Router::new()
        .route("/", get(rest::index))
        .route("/api/restaurants", get(rest::restaurants))
        .route("/api/search", get(rest::search))
        .route("/api/heatmap", get(rest::heatmap))
        .with_state(state)
        .layer(CorsLayer::permissive())
        // Log method + path + status only, never the query text
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Tastemap API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
