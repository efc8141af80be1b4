use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use tastemap_common::{EngineError, GeoCell, GeoPoint, PlaceId, PlaceSummary, RawReview};

use crate::{PlaceSearcher, ReviewFetcher, SearchPage};

const PLACES_API_URL: &str = "https://places.googleapis.com/v1";
const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.location";
const DETAILS_FIELD_MASK: &str = "reviews";

/// Google Places API (New, v1) client. One search call per cell via
/// `places:searchNearby` with a circle restriction, one details call per
/// place for reviews.
pub struct GooglePlacesClient {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    result_cap: usize,
    language_code: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: &str, result_cap: usize) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .expect("Failed to build Places HTTP client"),
            base_url: PLACES_API_URL.to_string(),
            result_cap,
            language_code: "fr".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    pub fn with_language(mut self, code: &str) -> Self {
        self.language_code = code.to_string();
        self
    }
}

/// Classify an HTTP status into the engine's provider error taxonomy.
/// Rate limits and server-side failures are worth retrying; auth and quota
/// problems are not.
fn classify_status(status: StatusCode, body: String) -> EngineError {
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EngineError::ProviderTransient(format!("Places API {status}: {body}"))
    } else {
        EngineError::ProviderPermanent(format!("Places API {status}: {body}"))
    }
}

fn network_err(e: reqwest::Error) -> EngineError {
    // Connect failures and timeouts are transient by definition
    EngineError::ProviderTransient(format!("Places request failed: {e}"))
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct SearchNearbyResponse {
    #[serde(default)]
    places: Vec<WirePlace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePlace {
    id: String,
    display_name: Option<WireText>,
    location: Option<WireLatLng>,
}

#[derive(Debug, Deserialize)]
struct WireText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WireLatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    reviews: Vec<WireReview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReview {
    text: Option<WireReviewText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReviewText {
    text: String,
    language_code: Option<String>,
}

#[async_trait]
impl PlaceSearcher for GooglePlacesClient {
    async fn search(&self, cell: &GeoCell) -> Result<SearchPage, EngineError> {
        let url = format!("{}/places:searchNearby", self.base_url);

        let body = serde_json::json!({
            "languageCode": self.language_code,
            "includedPrimaryTypes": ["restaurant"],
            "maxResultCount": self.result_cap,
            "locationRestriction": {
                "circle": {
                    "center": {
                        "latitude": cell.center.lat,
                        "longitude": cell.center.lng,
                    },
                    "radius": cell.radius_m,
                }
            }
        });

        debug!(cell = %cell.key(), radius_m = cell.radius_m, "Places searchNearby");

        let response = self
            .http
            .post(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", SEARCH_FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(network_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let data: SearchNearbyResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ProviderPermanent(format!("Bad searchNearby body: {e}")))?;

        let places: Vec<PlaceSummary> = data
            .places
            .into_iter()
            .filter_map(|p| {
                let loc = p.location?;
                Some(PlaceSummary {
                    id: PlaceId::new(p.id),
                    name: p.display_name.map(|n| n.text).unwrap_or_default(),
                    location: GeoPoint {
                        lat: loc.latitude,
                        lng: loc.longitude,
                    },
                })
            })
            .collect();

        let saturated = places.len() >= self.result_cap;
        info!(
            cell = %cell.key(),
            count = places.len(),
            saturated,
            "Cell search complete"
        );

        Ok(SearchPage { places, saturated })
    }
}

#[async_trait]
impl ReviewFetcher for GooglePlacesClient {
    async fn fetch_reviews(&self, id: &PlaceId) -> Result<Vec<RawReview>, EngineError> {
        let url = format!("{}/places/{}", self.base_url, id);

        let response = self
            .http
            .get(&url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", DETAILS_FIELD_MASK)
            .query(&[("languageCode", self.language_code.as_str())])
            .send()
            .await
            .map_err(network_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, text));
        }

        let data: DetailsResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ProviderPermanent(format!("Bad details body: {e}")))?;

        let reviews: Vec<RawReview> = data
            .reviews
            .into_iter()
            .filter_map(|r| {
                let t = r.text?;
                if t.text.is_empty() {
                    return None;
                }
                Some(RawReview {
                    text: t.text,
                    language: t.language_code,
                })
            })
            .collect();

        debug!(place_id = %id, count = reviews.len(), "Fetched reviews");
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_transient() {
        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(err.is_transient());
    }

    #[test]
    fn server_error_is_transient() {
        let err = classify_status(StatusCode::BAD_GATEWAY, String::new());
        assert!(err.is_transient());
    }

    #[test]
    fn auth_failure_is_permanent() {
        let err = classify_status(StatusCode::FORBIDDEN, "quota".into());
        assert!(!err.is_transient());
    }
}
