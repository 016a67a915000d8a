use std::cmp::Ordering;

use catalog::{Catalog, DestinationId, TagVocabulary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::scorer::Scorer;

/// Ranking knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendConfig {
    /// Maximum number of recommendations returned.
    pub top_k: usize,
    /// Score destinations on the rayon pool.
    pub use_parallel: bool,
}

impl RecommendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            use_parallel: false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecommendError {
    #[error("query vector has {actual} slots but the vocabulary has {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("{vectors} encoded vectors for a catalog of {destinations}")]
    CatalogMismatch { destinations: usize, vectors: usize },
}

/// A scored destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub score: f32,
    pub id: DestinationId,
    pub name: String,
    pub tags: Vec<String>,
    /// Position of the destination in the catalog.
    pub index: usize,
}

/// Score every destination against `query` and keep the best `cfg.top_k`.
///
/// Results are ordered by non-increasing score. Equal scores keep catalog
/// order and NaN scores sort last, so the ranking is reproducible for a
/// given scorer.
pub fn recommend<S>(
    scorer: &S,
    catalog: &Catalog,
    vocab: &TagVocabulary,
    query: &[f32],
    cfg: &RecommendConfig,
) -> Result<Vec<Recommendation>, RecommendError>
where
    S: Scorer + ?Sized,
{
    let vectors = vocab.encode_catalog(catalog);
    recommend_encoded(scorer, catalog, vocab, &vectors, query, cfg)
}

/// [`recommend`] over vectors already produced by
/// [`TagVocabulary::encode_catalog`] for this catalog.
pub fn recommend_encoded<S>(
    scorer: &S,
    catalog: &Catalog,
    vocab: &TagVocabulary,
    vectors: &[Vec<f32>],
    query: &[f32],
    cfg: &RecommendConfig,
) -> Result<Vec<Recommendation>, RecommendError>
where
    S: Scorer + ?Sized,
{
    if vectors.len() != catalog.len() {
        return Err(RecommendError::CatalogMismatch {
            destinations: catalog.len(),
            vectors: vectors.len(),
        });
    }
    if query.len() != vocab.len() {
        return Err(RecommendError::Dimension {
            expected: vocab.len(),
            actual: query.len(),
        });
    }
    if cfg.top_k == 0 {
        return Ok(Vec::new());
    }

    let scores: Vec<f32> = if cfg.use_parallel {
        vectors.par_iter().map(|d| scorer.score(query, d)).collect()
    } else {
        scorer.score_batch(query, vectors)
    };

    let mut ranked: Vec<(usize, f32)> = scores.into_iter().enumerate().collect();
    // Stable, so ties stay in catalog order.
    ranked.sort_by(|a, b| rank_order(a.1, b.1));
    ranked.truncate(cfg.top_k);

    let dests = catalog.destinations();
    let results: Vec<Recommendation> = ranked
        .into_iter()
        .map(|(index, score)| {
            let d = &dests[index];
            Recommendation {
                score,
                id: d.id.clone(),
                name: d.name.clone(),
                tags: d.tags.clone(),
                index,
            }
        })
        .collect();

    debug!(
        candidates = catalog.len(),
        returned = results.len(),
        top_score = ?results.first().map(|r| r.score),
        "recommend_ranked"
    );
    Ok(results)
}

/// Encode `tags` through `vocab` and rank against it.
pub fn recommend_tags<S, I, T>(
    scorer: &S,
    catalog: &Catalog,
    vocab: &TagVocabulary,
    tags: I,
    cfg: &RecommendConfig,
) -> Result<Vec<Recommendation>, RecommendError>
where
    S: Scorer + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let query = vocab.encode(tags);
    recommend(scorer, catalog, vocab, &query, cfg)
}

/// Descending by score, NaN last.
fn rank_order(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
