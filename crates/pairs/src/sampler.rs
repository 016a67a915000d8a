use std::collections::BTreeSet;
use std::time::Instant;

use catalog::{Catalog, TagVocabulary};
use tracing::{debug, info, warn, Level};

use crate::config::{ExhaustionPolicy, PairConfig, SampleError};
use crate::pair::{PairSet, TrainingPair};

/// Generate `cfg.iterations` positive and `cfg.iterations` negative pairs.
///
/// Each step draws a seed destination uniformly at random and emits
/// `(seed, seed, 1)`. It then draws candidates uniformly at random until one
/// shares no tag with the seed and emits `(seed, candidate, 0)`. The seed
/// itself is never accepted as its own negative. At most `cfg.max_attempts`
/// random draws are made per negative. If all of them miss, the catalog is
/// scanned once and a disjoint destination is picked uniformly from the
/// matches. Only when no destination is disjoint does `cfg.on_exhausted`
/// decide.
pub fn sample_pairs(
    catalog: &Catalog,
    vocab: &TagVocabulary,
    cfg: &PairConfig,
) -> Result<PairSet, SampleError> {
    let vectors = vocab.encode_catalog(catalog);
    sample_pairs_encoded(catalog, vocab, &vectors, cfg)
}

/// [`sample_pairs`] over vectors already produced by
/// [`TagVocabulary::encode_catalog`] for this catalog.
pub fn sample_pairs_encoded(
    catalog: &Catalog,
    vocab: &TagVocabulary,
    vectors: &[Vec<f32>],
    cfg: &PairConfig,
) -> Result<PairSet, SampleError> {
    let start = Instant::now();
    let span = tracing::span!(
        Level::INFO,
        "pairs.sample",
        destinations = catalog.len(),
        iterations = cfg.iterations
    );
    let _guard = span.enter();

    match sample_pairs_inner(catalog, vocab, vectors, cfg) {
        Ok(set) => {
            info!(
                positives = set.positive_count(),
                negatives = set.negative_count(),
                fallbacks = set.fallback_count(),
                elapsed_micros = start.elapsed().as_micros(),
                "sample_success"
            );
            Ok(set)
        }
        Err(err) => {
            warn!(
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "sample_failure"
            );
            Err(err)
        }
    }
}

fn sample_pairs_inner(
    catalog: &Catalog,
    vocab: &TagVocabulary,
    vectors: &[Vec<f32>],
    cfg: &PairConfig,
) -> Result<PairSet, SampleError> {
    cfg.validate()?;
    match catalog.len() {
        0 => return Err(SampleError::EmptyCatalog),
        1 => return Err(SampleError::SingleDestination),
        _ => {}
    }
    check_vectors(catalog, vocab, vectors)?;

    let tag_sets: Vec<BTreeSet<&str>> = catalog.iter().map(|d| d.tag_set()).collect();
    let mut rng = fastrand::Rng::with_seed(cfg.seed);

    let mut pairs = Vec::with_capacity(cfg.iterations * 2);
    let mut fallback_count = 0usize;

    for _ in 0..cfg.iterations {
        let seed = rng.usize(..catalog.len());
        let user = &vectors[seed];

        pairs.push(TrainingPair {
            user: user.clone(),
            destination: user.clone(),
            label: 1,
            seed_index: seed,
            destination_index: seed,
        });

        let drawn = draw_disjoint(&mut rng, &tag_sets, seed, cfg.max_attempts)
            .or_else(|| scan_disjoint(&mut rng, &tag_sets, seed));
        let negative = match drawn {
            Some(idx) => idx,
            None => match cfg.on_exhausted {
                ExhaustionPolicy::Fail => {
                    return Err(SampleError::NoDisjointDestination {
                        seed_id: catalog.destinations()[seed].id.to_string(),
                        attempts: cfg.max_attempts,
                    });
                }
                ExhaustionPolicy::LeastOverlap => {
                    let idx = least_overlap(&tag_sets, seed);
                    debug!(
                        seed_id = %catalog.destinations()[seed].id,
                        negative_id = %catalog.destinations()[idx].id,
                        "negative_fallback"
                    );
                    fallback_count += 1;
                    idx
                }
            },
        };

        pairs.push(TrainingPair {
            user: user.clone(),
            destination: vectors[negative].clone(),
            label: 0,
            seed_index: seed,
            destination_index: negative,
        });
    }

    if fallback_count > 0 {
        warn!(
            fallbacks = fallback_count,
            "negatives sampled by least overlap; some negative pairs share tags with their seed"
        );
    }

    Ok(PairSet::with_fallbacks(pairs, vocab.len(), fallback_count))
}

/// Bounded rejection sampling for a destination sharing no tag with `seed`.
fn draw_disjoint(
    rng: &mut fastrand::Rng,
    tag_sets: &[BTreeSet<&str>],
    seed: usize,
    max_attempts: usize,
) -> Option<usize> {
    let seed_tags = &tag_sets[seed];
    for _ in 0..max_attempts {
        let candidate = rng.usize(..tag_sets.len());
        if candidate != seed && seed_tags.is_disjoint(&tag_sets[candidate]) {
            return Some(candidate);
        }
    }
    None
}

/// Uniform pick among every destination disjoint from `seed`, if any.
fn scan_disjoint(
    rng: &mut fastrand::Rng,
    tag_sets: &[BTreeSet<&str>],
    seed: usize,
) -> Option<usize> {
    let seed_tags = &tag_sets[seed];
    let candidates: Vec<usize> = tag_sets
        .iter()
        .enumerate()
        .filter(|&(idx, tags)| idx != seed && seed_tags.is_disjoint(tags))
        .map(|(idx, _)| idx)
        .collect();
    if candidates.is_empty() {
        return None;
    }
    debug!(seed, candidates = candidates.len(), "negative_scan");
    Some(candidates[rng.usize(..candidates.len())])
}

fn check_vectors(
    catalog: &Catalog,
    vocab: &TagVocabulary,
    vectors: &[Vec<f32>],
) -> Result<(), SampleError> {
    if vectors.len() != catalog.len() {
        return Err(SampleError::EncodingMismatch {
            expected: catalog.len(),
            actual: vectors.len(),
        });
    }
    if let Some(v) = vectors.iter().find(|v| v.len() != vocab.len()) {
        return Err(SampleError::EncodingMismatch {
            expected: vocab.len(),
            actual: v.len(),
        });
    }
    Ok(())
}

/// Index (other than `seed`) with the fewest shared tags; first in catalog
/// order on ties. Callers guarantee at least two destinations.
fn least_overlap(tag_sets: &[BTreeSet<&str>], seed: usize) -> usize {
    let seed_tags = &tag_sets[seed];
    tag_sets
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != seed)
        .min_by_key(|(_, tags)| seed_tags.intersection(tags).count())
        .map(|(idx, _)| idx)
        .unwrap_or(seed)
}
