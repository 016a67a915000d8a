//! # Wayfarer Towers
//!
//! The learned scorer: a two-tower network trained on [`pairs::PairSet`]s and
//! exported to a compact int8 artifact.
//!
//! Both stages sit behind narrow traits so the pipeline does not depend on
//! how a model is fit or serialized:
//!
//! - [`Trainer::train`] turns pairs into a [`recommend::Scorer`].
//! - [`Exporter::export`] turns a model into artifact bytes, which
//!   [`write_artifact`] persists.
//!
//! [`TwoTowerTrainer`] and [`QuantizedExporter`] are the in-tree
//! implementations.
//!
//! ```
//! use catalog::{Catalog, TagVocabulary};
//! use pairs::{sample_pairs, PairConfig};
//! use towers::{Exporter, ModelArtifact, QuantizedExporter, TrainConfig, Trainer, TwoTowerTrainer};
//!
//! let catalog = Catalog::from_json(r#"[
//!     {"id": 1, "name": "Manali", "tags": ["mountains"]},
//!     {"id": 2, "name": "Goa", "tags": ["beach"]}
//! ]"#).unwrap();
//! let vocab = TagVocabulary::from_catalog(&catalog).unwrap();
//! let set = sample_pairs(&catalog, &vocab, &PairConfig::new().with_iterations(50)).unwrap();
//!
//! let trainer = TwoTowerTrainer::new(TrainConfig::new().with_embedding_dim(8).with_epochs(2));
//! let outcome = trainer.train(&set).unwrap();
//!
//! let bytes = QuantizedExporter::default().export(&outcome.model, &vocab).unwrap();
//! let artifact = ModelArtifact::from_bytes(&bytes).unwrap();
//! assert_eq!(artifact.vocabulary, vocab);
//! ```

pub mod config;
pub mod export;
mod model;
mod train;

pub use crate::config::{TrainConfig, TrainError};
pub use crate::export::{
    read_artifact, write_artifact, ExportConfig, ExportError, Exporter, ModelArtifact,
    QuantizedExporter, QuantizedTensor, ARTIFACT_MAGIC, ARTIFACT_VERSION,
};
pub use crate::model::TwoTowerModel;
pub use crate::train::{
    evaluate, EpochMetrics, TrainOutcome, Trainer, TrainingHistory, TwoTowerTrainer,
};
