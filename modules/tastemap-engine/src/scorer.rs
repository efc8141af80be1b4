//! Similarity scoring of semantic profiles against a query embedding.
//!
//! Cosine similarity, rescaled into [0,1] so downstream consumers never see
//! a negative score, ranked descending with ties broken by ascending place
//! id. Places without a profile are simply not in the input — they are never
//! scored as zero.

use serde::{Deserialize, Serialize};

use tastemap_common::{EngineError, SimilarityResult};

use crate::store::ProfileEntry;

/// How the natural cosine range [-1,1] maps into the [0,1] scores the rest
/// of the system consumes. Kept configurable: the shifted form is the
/// default, clamping is available where negative similarity should read as
/// plain zero rather than 0.5-centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescalePolicy {
    /// `(cosine + 1) / 2`
    #[default]
    ShiftedCosine,
    /// `max(cosine, 0)`
    ClampNegative,
}

impl RescalePolicy {
    pub fn apply(&self, cosine: f32) -> f32 {
        let score = match self {
            RescalePolicy::ShiftedCosine => (cosine + 1.0) / 2.0,
            RescalePolicy::ClampNegative => cosine.max(0.0),
        };
        score.clamp(0.0, 1.0)
    }
}

/// Cosine similarity between two equal-length vectors. Zero-magnitude input
/// yields 0.0 rather than NaN.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank every profile against the query vector.
///
/// Entries below `threshold` are excluded from the returned list — the
/// underlying store is untouched. The initial rendering weight equals the
/// score; the heatmap mapper may remap it later.
pub fn rank(
    query: &[f32],
    entries: &[ProfileEntry],
    policy: RescalePolicy,
    threshold: Option<f32>,
) -> Result<Vec<SimilarityResult>, EngineError> {
    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.vector.len() != query.len() {
            return Err(EngineError::DimensionMismatch {
                expected: query.len(),
                actual: entry.vector.len(),
            });
        }
        let score = policy.apply(cosine(query, &entry.vector));
        if let Some(t) = threshold {
            if score < t {
                continue;
            }
        }
        results.push(SimilarityResult {
            place_id: entry.place_id.clone(),
            name: entry.name.clone(),
            location: entry.location,
            similarity: score,
            weight: score,
        });
    }

    // Descending by score, ascending place id on ties — total order,
    // identical across runs.
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.place_id.cmp(&b.place_id))
    });
    Ok(results)
}
