//! Score blending for hybrid search and the cosine similarity used by the
//! in-process backend.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::types::{HybridHit, HybridWeights, KeywordHit, SourceBreakdown, VectorHit};

/// Cosine similarity of two vectors. Mismatched lengths or a zero vector score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Default)]
struct Candidate {
    chunk_text: Option<String>,
    vector: Option<f64>,
    keyword: Option<f64>,
}

/// Merge vector and keyword matches per entity.
///
/// Each list is normalised by its own maximum (negative scores count as 0),
/// then `combined = weights.vector * vector + weights.solr * keyword`. An
/// entity with several matching chunks keeps its best chunk.
pub fn blend(
    vector_hits: &[VectorHit],
    keyword_hits: &[KeywordHit],
    weights: HybridWeights,
    limit: usize,
) -> (Vec<HybridHit>, SourceBreakdown) {
    let mut candidates: HashMap<(String, String), Candidate> = HashMap::new();

    let vector_max = max_score(vector_hits.iter().map(|h| h.similarity));
    for hit in vector_hits {
        let normalised = normalise(hit.similarity, vector_max);
        let entry = candidates
            .entry((hit.entity_type.clone(), hit.entity_id.clone()))
            .or_default();
        if entry.vector.map_or(true, |existing| normalised > existing) {
            entry.vector = Some(normalised);
            entry.chunk_text = hit.chunk_text.clone();
        }
    }

    let keyword_max = max_score(keyword_hits.iter().map(|h| h.score));
    for hit in keyword_hits {
        let normalised = normalise(hit.score, keyword_max);
        let entry = candidates
            .entry((hit.entity_type.clone(), hit.entity_id.clone()))
            .or_default();
        entry.keyword = Some(entry.keyword.map_or(normalised, |k| k.max(normalised)));
    }

    let mut merged: Vec<HybridHit> = candidates
        .into_iter()
        .map(|((entity_type, entity_id), c)| HybridHit {
            entity_type,
            entity_id,
            chunk_text: c.chunk_text,
            combined_score: weights.vector * c.vector.unwrap_or(0.0)
                + weights.solr * c.keyword.unwrap_or(0.0),
            vector_score: c.vector,
            keyword_score: c.keyword,
        })
        .collect();

    merged.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entity_type.cmp(&b.entity_type))
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
    merged.truncate(limit);

    let mut breakdown = SourceBreakdown::default();
    for hit in &merged {
        match (hit.vector_score.is_some(), hit.keyword_score.is_some()) {
            (true, true) => breakdown.both += 1,
            (true, false) => breakdown.vector_only += 1,
            (false, true) => breakdown.keyword_only += 1,
            (false, false) => {}
        }
    }

    (merged, breakdown)
}

fn max_score(scores: impl Iterator<Item = f64>) -> f64 {
    scores.fold(0.0, f64::max)
}

fn normalise(score: f64, max: f64) -> f64 {
    if max <= 0.0 {
        0.0
    } else {
        score.max(0.0) / max
    }
}
