use serde::{Deserialize, Serialize};

/// One labeled `(user, destination)` example.
///
/// `seed_index` and `destination_index` point into the catalog the pair was
/// generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub user: Vec<f32>,
    pub destination: Vec<f32>,
    /// `1` for a liked destination, `0` for a rejected one.
    pub label: u8,
    pub seed_index: usize,
    pub destination_index: usize,
}

impl TrainingPair {
    pub fn is_positive(&self) -> bool {
        self.label == 1
    }
}

/// Generated pairs in generation order, plus sampling diagnostics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PairSet {
    pairs: Vec<TrainingPair>,
    dimension: usize,
    fallback_count: usize,
}

impl PairSet {
    /// Wrap externally produced pairs. Every vector is expected to have
    /// length `dimension`.
    pub fn from_pairs(pairs: Vec<TrainingPair>, dimension: usize) -> Self {
        Self::with_fallbacks(pairs, dimension, 0)
    }

    pub(crate) fn with_fallbacks(
        pairs: Vec<TrainingPair>,
        dimension: usize,
        fallback_count: usize,
    ) -> Self {
        Self {
            pairs,
            dimension,
            fallback_count,
        }
    }

    pub fn pairs(&self) -> &[TrainingPair] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<TrainingPair> {
        self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Feature vector length shared by all pairs.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Negatives chosen by the least-overlap fallback rather than by
    /// rejection sampling.
    pub fn fallback_count(&self) -> usize {
        self.fallback_count
    }

    pub fn positives(&self) -> impl Iterator<Item = &TrainingPair> {
        self.pairs.iter().filter(|p| p.is_positive())
    }

    pub fn negatives(&self) -> impl Iterator<Item = &TrainingPair> {
        self.pairs.iter().filter(|p| !p.is_positive())
    }

    pub fn positive_count(&self) -> usize {
        self.positives().count()
    }

    pub fn negative_count(&self) -> usize {
        self.negatives().count()
    }

    /// `(rows, columns)` of the user matrix, destination matrix and label
    /// vector a trainer would build: `((n, d), (n, d), n)`.
    pub fn shapes(&self) -> ((usize, usize), (usize, usize), usize) {
        let n = self.pairs.len();
        ((n, self.dimension), (n, self.dimension), n)
    }
}
