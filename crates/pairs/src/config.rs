//! Configuration and error types for training pair generation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What to do when no disjoint negative is found within `max_attempts` draws.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Abort generation with [`SampleError::NoDisjointDestination`].
    #[default]
    Fail,
    /// Use the destination with the smallest tag overlap instead.
    LeastOverlap,
}

/// Configuration for [`crate::sample_pairs`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PairConfig {
    /// Number of generation steps. Each step yields one positive and one
    /// negative pair.
    pub iterations: usize,
    /// Upper bound on candidate draws per negative.
    pub max_attempts: usize,
    /// Random seed. Equal seeds over equal catalogs produce identical pairs.
    pub seed: u64,
    pub on_exhausted: ExhaustionPolicy,
}

impl PairConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.on_exhausted = policy;
        self
    }

    pub fn validate(&self) -> Result<(), SampleError> {
        if self.iterations == 0 {
            return Err(SampleError::InvalidConfig(
                "iterations must be >= 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SampleError::InvalidConfig(
                "max_attempts must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            max_attempts: 1_000,
            seed: 0x5EED_CAFE_D00D_F00D,
            on_exhausted: ExhaustionPolicy::Fail,
        }
    }
}

/// Errors returned by pair generation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SampleError {
    #[error("catalog contains no destinations")]
    EmptyCatalog,
    #[error("negative sampling needs at least two destinations")]
    SingleDestination,
    #[error("invalid pair config: {0}")]
    InvalidConfig(String),
    #[error("encoded catalog has {actual} entries or slots; expected {expected}")]
    EncodingMismatch { expected: usize, actual: usize },
    #[error("no destination is disjoint from seed {seed_id} after {attempts} draws and a scan")]
    NoDisjointDestination { seed_id: String, attempts: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = PairConfig::default();
        assert_eq!(cfg.iterations, 10_000);
        assert_eq!(cfg.max_attempts, 1_000);
        assert_eq!(cfg.on_exhausted, ExhaustionPolicy::Fail);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_builder_chain() {
        let cfg = PairConfig::new()
            .with_iterations(5)
            .with_max_attempts(7)
            .with_seed(9)
            .with_policy(ExhaustionPolicy::LeastOverlap);
        assert_eq!(cfg.iterations, 5);
        assert_eq!(cfg.max_attempts, 7);
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.on_exhausted, ExhaustionPolicy::LeastOverlap);
    }

    #[test]
    fn config_validate_rejects_zero_bounds() {
        assert!(matches!(
            PairConfig::new().with_iterations(0).validate(),
            Err(SampleError::InvalidConfig(_))
        ));
        assert!(matches!(
            PairConfig::new().with_max_attempts(0).validate(),
            Err(SampleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn policy_serde_snake_case() {
        let json = serde_json::to_string(&ExhaustionPolicy::LeastOverlap).unwrap();
        assert_eq!(json, "\"least_overlap\"");
        let cfg: PairConfig = serde_json::from_str(r#"{"iterations": 3}"#).unwrap();
        assert_eq!(cfg.iterations, 3);
        assert_eq!(cfg.max_attempts, 1_000);
    }

    #[test]
    fn error_display_no_disjoint() {
        let err = SampleError::NoDisjointDestination {
            seed_id: "7".into(),
            attempts: 1000,
        };
        assert_eq!(
            err.to_string(),
            "no disjoint destination found for seed 7 after 1000 attempts"
        );
    }
}
