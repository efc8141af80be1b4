//! Semantic profile aggregation.
//!
//! One embedding batch call per place, then an unweighted mean over the
//! review vectors. The mean is order-independent and recomputing it from the
//! same review set gives the same profile, so resumed passes are safe. A
//! place with no usable reviews gets no profile — absence, not a zero vector.

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use embed_client::Embedder;
use tastemap_common::{EngineError, PlaceRecord, SemanticProfile};

/// How many places encode concurrently. Each place is one batch call, so
/// this bounds in-flight requests against the embedding provider.
const MAX_CONCURRENT_PLACES: usize = 4;

/// Unweighted mean of review vectors, validating every vector against the
/// deployment dimension. A mismatched vector is a hard error — it signals a
/// provider or config inconsistency and must never be padded or truncated.
pub fn mean_vector(vectors: &[Vec<f32>], dim: usize) -> Result<Vec<f32>, EngineError> {
    if vectors.is_empty() {
        // Callers skip empty review sets before encoding; reaching this
        // means a bug upstream, not an absent profile.
        return Err(EngineError::Config("cannot aggregate an empty vector batch".into()));
    }
    for v in vectors {
        if v.len() != dim {
            return Err(EngineError::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
    }
    let mut mean = vec![0.0f32; dim];
    for v in vectors {
        for (slot, x) in mean.iter_mut().zip(v) {
            *slot += x;
        }
    }
    let n = vectors.len() as f32;
    for slot in &mut mean {
        *slot /= n;
    }
    Ok(mean)
}

/// Build the profile for one place, or `None` when it has no usable reviews.
pub async fn build_profile(
    record: &PlaceRecord,
    embedder: &dyn Embedder,
) -> Result<Option<SemanticProfile>, EngineError> {
    let texts: Vec<String> = record.reviews.iter().map(|r| r.text.clone()).collect();
    if texts.is_empty() {
        info!(place_id = %record.id, "No usable reviews, skipping profile");
        return Ok(None);
    }

    let vectors = embedder.embed_batch(&texts).await?;
    let vector = mean_vector(&vectors, embedder.dim())?;

    Ok(Some(SemanticProfile {
        place_id: record.id.clone(),
        vector,
        review_count: texts.len(),
    }))
}

/// Build profiles for every place, a bounded number of places in flight at
/// once. Transient encode failures skip the place (its id is returned as a
/// coverage gap); dimension mismatches and permanent provider errors abort.
pub async fn build_profiles(
    records: &[PlaceRecord],
    embedder: &dyn Embedder,
) -> Result<(Vec<SemanticProfile>, Vec<String>), EngineError> {
    let results: Vec<_> = stream::iter(records)
        .map(|record| async move { (record, build_profile(record, embedder).await) })
        .buffer_unordered(MAX_CONCURRENT_PLACES)
        .collect()
        .await;

    let mut profiles = Vec::new();
    let mut gaps = Vec::new();
    for (record, result) in results {
        match result {
            Ok(Some(profile)) => profiles.push(profile),
            Ok(None) => {}
            Err(e) if e.is_transient() => {
                warn!(place_id = %record.id, error = %e, "Encoding failed, skipping place");
                gaps.push(format!("place:{}", record.id));
            }
            Err(e) => return Err(e),
        }
    }

    // buffer_unordered scrambles completion order
    profiles.sort_by(|a, b| a.place_id.cmp(&b.place_id));
    Ok((profiles, gaps))
}
