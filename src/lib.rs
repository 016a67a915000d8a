//! Workspace umbrella crate for Wayfarer.
//!
//! This crate wires the stage crates into one synchronous run: load the
//! catalog, derive the vocabulary, sample pairs, train, rank a sample user
//! and export the quantized model.

pub mod config;

pub use crate::config::{ConfigError, LogFormat, WayfarerConfig};
pub use catalog::{Catalog, CatalogError, Destination, DestinationId, TagVocabulary, load_catalog};
pub use pairs::{
    ExhaustionPolicy, PairConfig, PairSet, SampleError, TrainingPair, sample_pairs,
    sample_pairs_encoded,
};
pub use recommend::{
    CosineScorer, RecommendConfig, RecommendError, Recommendation, Scorer, recommend,
    recommend_encoded, recommend_tags,
};
pub use towers::{
    ExportConfig, ExportError, Exporter, ModelArtifact, QuantizedExporter, TrainConfig,
    TrainError, Trainer, TrainingHistory, TwoTowerModel, TwoTowerTrainer, write_artifact,
};

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

/// Errors that can end a pipeline run.
///
/// `Display` names the failed stage only; the stage error is the
/// [`source`](Error::source), so `{:#}` renders each message once.
#[derive(Debug)]
pub enum PipelineError {
    Config(ConfigError),
    Catalog(CatalogError),
    Sample(SampleError),
    Train(TrainError),
    Recommend(RecommendError),
    Export(ExportError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(_) => write!(f, "configuration failure"),
            PipelineError::Catalog(_) => write!(f, "catalog failure"),
            PipelineError::Sample(_) => write!(f, "pair sampling failed"),
            PipelineError::Train(_) => write!(f, "training failed"),
            PipelineError::Recommend(_) => write!(f, "recommendation failed"),
            PipelineError::Export(_) => write!(f, "export failed"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Config(err) => Some(err),
            PipelineError::Catalog(err) => Some(err),
            PipelineError::Sample(err) => Some(err),
            PipelineError::Train(err) => Some(err),
            PipelineError::Recommend(err) => Some(err),
            PipelineError::Export(err) => Some(err),
        }
    }
}

impl From<ConfigError> for PipelineError {
    fn from(value: ConfigError) -> Self {
        PipelineError::Config(value)
    }
}

impl From<CatalogError> for PipelineError {
    fn from(value: CatalogError) -> Self {
        PipelineError::Catalog(value)
    }
}

impl From<SampleError> for PipelineError {
    fn from(value: SampleError) -> Self {
        PipelineError::Sample(value)
    }
}

impl From<TrainError> for PipelineError {
    fn from(value: TrainError) -> Self {
        PipelineError::Train(value)
    }
}

impl From<RecommendError> for PipelineError {
    fn from(value: RecommendError) -> Self {
        PipelineError::Recommend(value)
    }
}

impl From<ExportError> for PipelineError {
    fn from(value: ExportError) -> Self {
        PipelineError::Export(value)
    }
}

/// What a run produced, for the console report and for tests.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub destinations: usize,
    pub vocabulary: TagVocabulary,
    pub pair_count: usize,
    pub fallback_count: usize,
    pub history: TrainingHistory,
    pub recommendations: Vec<Recommendation>,
    pub artifact_path: PathBuf,
    pub artifact_bytes: usize,
}

/// Run the full pipeline with the in-tree trainer and exporter.
pub fn run(cfg: &WayfarerConfig) -> Result<PipelineReport, PipelineError> {
    let trainer = TwoTowerTrainer::new(cfg.train.clone());
    let exporter = QuantizedExporter::new(cfg.export.clone());
    run_with(cfg, &trainer, &exporter)
}

/// Run the full pipeline through arbitrary [`Trainer`] and [`Exporter`]
/// implementations.
pub fn run_with<T, E>(
    cfg: &WayfarerConfig,
    trainer: &T,
    exporter: &E,
) -> Result<PipelineReport, PipelineError>
where
    T: Trainer,
    E: Exporter<Model = T::Model>,
{
    let start = Instant::now();
    let span = tracing::span!(Level::INFO, "wayfarer.run", catalog = %cfg.catalog_path.display());
    let _guard = span.enter();

    cfg.validate()?;

    let (catalog, vocab) = load_catalog(&cfg.catalog_path)?;
    info!(
        destinations = catalog.len(),
        vocabulary = vocab.len(),
        tags = ?vocab.tags(),
        "vocabulary_built"
    );

    let vectors = vocab.encode_catalog(&catalog);
    let set = sample_pairs_encoded(&catalog, &vocab, &vectors, &cfg.pairs)?;
    let (users, dests, labels) = set.shapes();
    info!(
        users = ?users,
        destinations = ?dests,
        labels,
        fallbacks = set.fallback_count(),
        "pairs_ready"
    );

    let outcome = trainer.train(&set)?;
    let query = vocab.encode(&cfg.query_tags);
    let recommendations = recommend_encoded(
        &outcome.model,
        &catalog,
        &vocab,
        &vectors,
        &query,
        &cfg.recommend,
    )?;

    let bytes = exporter.export(&outcome.model, &vocab)?;
    write_artifact(&cfg.output_path, &bytes)?;

    info!(
        artifact = %cfg.output_path.display(),
        bytes = bytes.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "pipeline_complete"
    );

    Ok(PipelineReport {
        destinations: catalog.len(),
        vocabulary: vocab,
        pair_count: set.len(),
        fallback_count: set.fallback_count(),
        history: outcome.history,
        recommendations,
        artifact_path: cfg.output_path.clone(),
        artifact_bytes: bytes.len(),
    })
}

/// One console line per recommendation.
pub fn format_recommendation(rec: &Recommendation) -> String {
    format!(
        "ID: {}, Name: {}, Score: {:.4}, Tags: [{}]",
        rec.id,
        rec.name,
        rec.score,
        rec.tags.join(", ")
    )
}

/// Install the global `tracing` subscriber. `RUST_LOG` wins over
/// `cfg.log_level`. Returns an error if a subscriber is already set.
pub fn init_tracing(cfg: &WayfarerConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.log_level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match cfg.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
