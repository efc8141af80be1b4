//! REST handlers and the JSON view shapes they return.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use tastemap_common::{BoundingBox, EngineError, PlaceRecord, SimilarityResult};
use tastemap_engine::heatmap::{viewport_weights, DEFAULT_VIEWPORT_MARGIN};
use tastemap_engine::scorer;

use crate::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;
const MAX_SEARCH_LIMIT: usize = 100;

// --- View Models ---

#[derive(Debug, Clone, Serialize)]
pub struct RestaurantView {
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub review_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub place_id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub similarity: f32,
}

pub fn inventory_views(records: &[PlaceRecord]) -> Vec<RestaurantView> {
    records
        .iter()
        .map(|r| RestaurantView {
            place_id: r.id.to_string(),
            name: r.name.clone(),
            lat: r.location.lat,
            lng: r.location.lng,
            review_count: r.reviews.len(),
        })
        .collect()
}

fn search_hits(results: &[SimilarityResult], limit: usize) -> Vec<SearchHit> {
    results
        .iter()
        .take(limit)
        .map(|r| SearchHit {
            place_id: r.place_id.to_string(),
            name: r.name.clone(),
            lat: r.location.lat,
            lng: r.location.lng,
            similarity: r.similarity,
        })
        .collect()
}

/// Ranked hits plus the scan's coverage gaps. An incomplete corpus still
/// answers best-effort; the gaps ride along as metadata, never as a failure.
fn search_response(
    results: &[SimilarityResult],
    limit: usize,
    coverage_gaps: &[String],
) -> serde_json::Value {
    serde_json::json!({
        "results": search_hits(results, limit),
        "coverage_gaps": coverage_gaps,
    })
}

/// `[lat, lng, weight]` triples, the shape heatmap renderers consume
/// directly, with the same gap metadata as search.
fn heatmap_response(results: &[SimilarityResult], coverage_gaps: &[String]) -> serde_json::Value {
    let points: Vec<serde_json::Value> = results
        .iter()
        .map(|r| serde_json::json!([r.location.lat, r.location.lng, r.weight]))
        .collect();
    serde_json::json!({
        "points": points,
        "count": results.len(),
        "coverage_gaps": coverage_gaps,
    })
}

// --- Handlers ---

pub async fn index() -> impl IntoResponse {
    Html(concat!(
        "<h1>Tastemap</h1>",
        "<p>GET /api/restaurants — discovered inventory</p>",
        "<p>GET /api/search?q=&amp;threshold=&amp;limit=</p>",
        "<p>GET /api/heatmap?q=&amp;threshold=&amp;min_lat=&amp;max_lat=&amp;min_lng=&amp;max_lng=</p>",
    ))
}

pub async fn restaurants(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.inventory.clone())
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    threshold: Option<f32>,
    limit: Option<usize>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    if params.q.trim().is_empty() {
        return bad_request("q must not be empty");
    }
    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .min(MAX_SEARCH_LIMIT);

    let ranked = match rank_query(&state, &params.q, params.threshold).await {
        Ok(ranked) => ranked,
        Err(response) => return response,
    };
    Json(search_response(&ranked, limit, &state.coverage_gaps)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    q: String,
    threshold: Option<f32>,
    min_lat: Option<f64>,
    max_lat: Option<f64>,
    min_lng: Option<f64>,
    max_lng: Option<f64>,
}

pub async fn heatmap(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HeatmapQuery>,
) -> impl IntoResponse {
    if params.q.trim().is_empty() {
        return bad_request("q must not be empty");
    }
    let viewport = match (params.min_lat, params.max_lat, params.min_lng, params.max_lng) {
        (Some(min_lat), Some(max_lat), Some(min_lng), Some(max_lng)) => BoundingBox {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        },
        _ => return bad_request("min_lat, max_lat, min_lng and max_lng are required"),
    };

    let ranked = match rank_query(&state, &params.q, params.threshold).await {
        Ok(ranked) => ranked,
        Err(response) => return response,
    };
    let visible = viewport_weights(&ranked, &viewport, DEFAULT_VIEWPORT_MARGIN, state.transform);
    Json(heatmap_response(&visible, &state.coverage_gaps)).into_response()
}

// --- Helpers ---

async fn rank_query(
    state: &AppState,
    q: &str,
    threshold: Option<f32>,
) -> Result<Vec<SimilarityResult>, axum::response::Response> {
    let query_vector = state.embedder.embed(q).await.map_err(|e| {
        warn!(error = %e, "Failed to encode query");
        embed_error_status(&e).into_response()
    })?;

    scorer::rank(&query_vector, &state.entries, state.policy, threshold).map_err(|e| {
        warn!(error = %e, "Ranking failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    })
}

fn embed_error_status(e: &EngineError) -> StatusCode {
    if e.is_transient() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tastemap_common::{GeoPoint, PlaceId, ReviewRecord};

    fn result(id: &str, lat: f64, lng: f64, similarity: f32) -> SimilarityResult {
        SimilarityResult {
            place_id: PlaceId::new(id),
            name: format!("Place {id}"),
            location: GeoPoint { lat, lng },
            similarity,
            weight: similarity,
        }
    }

    #[test]
    fn inventory_counts_reviews() {
        let id = PlaceId::new("P1");
        let records = vec![PlaceRecord {
            id: id.clone(),
            name: "Trattoria Roma".to_string(),
            location: GeoPoint { lat: 48.58, lng: 7.75 },
            reviews: vec![ReviewRecord {
                place_id: id,
                text: "cozy spot".to_string(),
                language: None,
                cell_key: "d0:a".to_string(),
            }],
        }];
        let views = inventory_views(&records);
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].review_count, 1);
        assert_eq!(views[0].name, "Trattoria Roma");
    }

    #[test]
    fn search_hits_respect_limit() {
        let results = vec![
            result("A", 48.58, 7.75, 0.9),
            result("B", 48.59, 7.76, 0.8),
            result("C", 48.60, 7.77, 0.7),
        ];
        let hits = search_hits(&results, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].place_id, "A");
        assert_eq!(hits[1].place_id, "B");
    }

    #[test]
    fn heatmap_points_are_lat_lng_weight_triples() {
        let results = vec![result("A", 48.58, 7.75, 0.9)];
        let value = heatmap_response(&results, &[]);
        assert_eq!(value["count"], 1);
        let point = &value["points"][0];
        assert_eq!(point[0], 48.58);
        assert_eq!(point[1], 7.75);
        assert!((point[2].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn responses_carry_gap_metadata() {
        let results = vec![result("A", 48.58, 7.75, 0.9)];
        let gaps = vec!["place:P7".to_string()];

        let search = search_response(&results, 10, &gaps);
        assert_eq!(search["coverage_gaps"][0], "place:P7");
        assert_eq!(search["results"].as_array().unwrap().len(), 1);

        let heat = heatmap_response(&results, &gaps);
        assert_eq!(heat["coverage_gaps"][0], "place:P7");
    }
}
