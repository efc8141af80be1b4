//! Viewport-scoped heatmap weight mapping.
//!
//! The ranked result list is global; rendering is not. Results are filtered
//! to the viewport (expanded by a margin so gradients do not clip at the
//! edges) and the [0,1] similarity is mapped to a rendering weight through a
//! monotonic transform, so visual intensity order always matches rank order.

use serde::{Deserialize, Serialize};

use tastemap_common::{BoundingBox, SimilarityResult};

/// Default viewport expansion so markers just off-screen still feed the
/// gradient.
pub const DEFAULT_VIEWPORT_MARGIN: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightTransform {
    #[default]
    Identity,
    /// Convex: sharpens contrast between high- and low-similarity areas.
    Square,
}

impl WeightTransform {
    pub fn apply(&self, similarity: f32) -> f32 {
        match self {
            WeightTransform::Identity => similarity,
            WeightTransform::Square => similarity * similarity,
        }
    }
}

/// Select the results visible in (or near) `viewport` and assign rendering
/// weights. Zero-weight results are omitted entirely — weight 0 means
/// transparent, never a faint minimum-intensity mark.
pub fn viewport_weights(
    results: &[SimilarityResult],
    viewport: &BoundingBox,
    margin: f64,
    transform: WeightTransform,
) -> Vec<SimilarityResult> {
    let scope = viewport.expand(margin);
    results
        .iter()
        .filter(|r| scope.contains(r.location))
        .filter_map(|r| {
            let weight = transform.apply(r.similarity);
            if weight == 0.0 {
                return None;
            }
            Some(SimilarityResult {
                weight,
                ..r.clone()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tastemap_common::{GeoPoint, PlaceId};

    fn result(id: &str, lat: f64, lng: f64, similarity: f32) -> SimilarityResult {
        SimilarityResult {
            place_id: PlaceId::new(id),
            name: format!("Place {id}"),
            location: GeoPoint { lat, lng },
            similarity,
            weight: similarity,
        }
    }

    fn viewport() -> BoundingBox {
        BoundingBox {
            min_lat: 48.55,
            max_lat: 48.60,
            min_lng: 7.70,
            max_lng: 7.80,
        }
    }

    #[test]
    fn filters_to_viewport_with_margin() {
        let results = vec![
            result("in", 48.57, 7.75, 0.8),
            // Just past the edge, inside the 10% margin
            result("near", 48.604, 7.75, 0.7),
            // Far outside
            result("far", 48.80, 7.75, 0.9),
        ];
        let visible = viewport_weights(
            &results,
            &viewport(),
            DEFAULT_VIEWPORT_MARGIN,
            WeightTransform::Identity,
        );
        let ids: Vec<String> = visible.iter().map(|r| r.place_id.to_string()).collect();
        assert_eq!(ids, vec!["in", "near"]);
    }

    #[test]
    fn identity_keeps_similarity_as_weight() {
        let results = vec![result("a", 48.57, 7.75, 0.64)];
        let visible =
            viewport_weights(&results, &viewport(), 0.0, WeightTransform::Identity);
        assert!((visible[0].weight - 0.64).abs() < 1e-6);
    }

    #[test]
    fn square_transform_preserves_order() {
        let results = vec![
            result("lo", 48.56, 7.72, 0.4),
            result("hi", 48.57, 7.75, 0.9),
            result("mid", 48.58, 7.78, 0.6),
        ];
        let mut visible =
            viewport_weights(&results, &viewport(), 0.0, WeightTransform::Square);
        visible.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap());
        let ids: Vec<String> = visible.iter().map(|r| r.place_id.to_string()).collect();
        assert_eq!(ids, vec!["hi", "mid", "lo"]);
        assert!((visible[0].weight - 0.81).abs() < 1e-6);
    }

    #[test]
    fn zero_weight_results_are_omitted() {
        let results = vec![
            result("zero", 48.57, 7.75, 0.0),
            result("live", 48.58, 7.76, 0.5),
        ];
        let visible =
            viewport_weights(&results, &viewport(), 0.0, WeightTransform::Identity);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].place_id, PlaceId::new("live"));
    }
}
