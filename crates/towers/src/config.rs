//! Configuration and error types for two-tower training.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hyperparameters for [`crate::TwoTowerTrainer`].
///
/// Defaults reproduce the reference setup: 64-wide towers, Adam at `1e-3`,
/// batches of 64, ten epochs, the trailing 20% of pairs held out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    /// Output width of each tower's dense layer.
    pub embedding_dim: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    /// Fraction of pairs, taken from the end of the list before any
    /// shuffling, used only for validation metrics. `0.0` disables it.
    pub validation_split: f32,
    /// Reshuffle the training part every epoch.
    pub shuffle: bool,
    /// Seed for weight initialization and shuffling.
    pub seed: u64,
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding_dim(mut self, embedding_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_validation_split(mut self, validation_split: f32) -> Self {
        self.validation_split = validation_split;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), TrainError> {
        if self.embedding_dim == 0 {
            return Err(TrainError::InvalidConfig(
                "embedding_dim must be >= 1".into(),
            ));
        }
        if self.epochs == 0 {
            return Err(TrainError::InvalidConfig("epochs must be >= 1".into()));
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig("batch_size must be >= 1".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::InvalidConfig(format!(
                "learning_rate must be finite and > 0 (got {})",
                self.learning_rate
            )));
        }
        for (name, beta) in [("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(TrainError::InvalidConfig(format!(
                    "{name} must be in [0, 1) (got {beta})"
                )));
            }
        }
        if self.epsilon.is_nan() || self.epsilon <= 0.0 {
            return Err(TrainError::InvalidConfig("epsilon must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(TrainError::InvalidConfig(format!(
                "validation_split must be in [0, 1) (got {})",
                self.validation_split
            )));
        }
        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            embedding_dim: 64,
            epochs: 10,
            batch_size: 64,
            learning_rate: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            validation_split: 0.2,
            shuffle: true,
            seed: 0x0DDB_A11C_AFE5_EED5,
        }
    }
}

/// Errors returned by training.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TrainError {
    #[error("no training pairs")]
    EmptyDataset,
    #[error("invalid train config: {0}")]
    InvalidConfig(String),
    #[error("pair {index} has a {actual}-slot vector; expected {expected}")]
    Dimension {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("{tensor} has shape {actual:?}; expected {expected:?}")]
    Shape {
        tensor: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("loss became non-finite in epoch {epoch}")]
    NonFinite { epoch: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_values() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.embedding_dim, 64);
        assert_eq!(cfg.epochs, 10);
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.learning_rate, 1e-3);
        assert_eq!(cfg.validation_split, 0.2);
        assert!(cfg.shuffle);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_validate_rejects_bad_values() {
        let cases = [
            TrainConfig::new().with_embedding_dim(0),
            TrainConfig::new().with_epochs(0),
            TrainConfig::new().with_batch_size(0),
            TrainConfig::new().with_learning_rate(0.0),
            TrainConfig::new().with_learning_rate(f32::NAN),
            TrainConfig::new().with_validation_split(1.0),
            TrainConfig::new().with_validation_split(-0.1),
            TrainConfig {
                beta2: 1.0,
                ..Default::default()
            },
            TrainConfig {
                epsilon: 0.0,
                ..Default::default()
            },
        ];
        for cfg in cases {
            assert!(
                matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))),
                "{cfg:?} should be rejected"
            );
        }
    }

    #[test]
    fn config_partial_serde_uses_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{"epochs": 3, "shuffle": false}"#).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert!(!cfg.shuffle);
        assert_eq!(cfg.batch_size, 64);
    }

    #[test]
    fn error_display_shape_names_tensor() {
        let err = TrainError::Shape {
            tensor: "dest_kernel",
            expected: vec![3, 2],
            actual: vec![4, 2],
        };
        assert_eq!(err.to_string(), "dest_kernel has shape [4, 2]; expected [3, 2]");
    }
}
