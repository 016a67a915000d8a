/// Compatibility score between a user profile and a destination, both
/// expressed as vocabulary feature vectors.
///
/// Implementations return values in `[0.0, 1.0]`, higher meaning a better
/// match. Both slices have the vocabulary length.
pub trait Scorer: Send + Sync {
    fn score(&self, user: &[f32], destination: &[f32]) -> f32;

    /// Score one user against many destinations.
    fn score_batch(&self, user: &[f32], destinations: &[Vec<f32>]) -> Vec<f32> {
        destinations.iter().map(|d| self.score(user, d)).collect()
    }
}

impl<T: Scorer + ?Sized> Scorer for &T {
    fn score(&self, user: &[f32], destination: &[f32]) -> f32 {
        (**self).score(user, destination)
    }

    fn score_batch(&self, user: &[f32], destinations: &[Vec<f32>]) -> Vec<f32> {
        (**self).score_batch(user, destinations)
    }
}

impl<T: Scorer + ?Sized> Scorer for Box<T> {
    fn score(&self, user: &[f32], destination: &[f32]) -> f32 {
        (**self).score(user, destination)
    }

    fn score_batch(&self, user: &[f32], destinations: &[Vec<f32>]) -> Vec<f32> {
        (**self).score_batch(user, destinations)
    }
}

/// Untrained baseline: cosine similarity of the two tag vectors.
///
/// Tag vectors are non-negative so the result is already in `[0, 1]`. A zero
/// vector on either side scores `0.0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CosineScorer;

impl Scorer for CosineScorer {
    fn score(&self, user: &[f32], destination: &[f32]) -> f32 {
        if user.len() != destination.len() || user.is_empty() {
            return 0.0;
        }
        let mut dot = 0.0f32;
        let mut norm_u = 0.0f32;
        let mut norm_d = 0.0f32;
        for (&u, &d) in user.iter().zip(destination) {
            dot += u * d;
            norm_u += u * u;
            norm_d += d * d;
        }
        if norm_u == 0.0 || norm_d == 0.0 {
            return 0.0;
        }
        (dot / (norm_u.sqrt() * norm_d.sqrt())).clamp(0.0, 1.0)
    }
}
