//! Layered configuration for the `wayfarer` pipeline.
//!
//! Sources, lowest to highest precedence:
//!
//! 1. built-in defaults,
//! 2. `wayfarer.{toml,yaml,json}` in the working directory (optional), or an
//!    explicit file passed to [`WayfarerConfig::load`] (required),
//! 3. `WAYFARER__*` environment variables, nested with `__`.
//!
//! ```toml
//! catalog_path = "scripts/destinations.json"
//! output_path  = "assets/recommendation_model.wfq"
//! query_tags   = ["trekking", "mountains"]
//! log_format   = "pretty"
//!
//! [pairs]
//! iterations   = 10000
//! max_attempts = 1000
//! on_exhausted = "least_overlap"
//!
//! [train]
//! epochs = 10
//!
//! [export]
//! compress = true
//! level    = 3
//! ```
//!
//! `WAYFARER__TRAIN__EPOCHS=3` or `WAYFARER__QUERY_TAGS=beach,nightlife`
//! override single keys.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pairs::PairConfig;
use recommend::RecommendConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use towers::{ExportConfig, TrainConfig};

pub const ENV_PREFIX: &str = "WAYFARER";
const DEFAULT_FILE: &str = "wayfarer";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Console log rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Everything one pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WayfarerConfig {
    /// JSON array of `{id, name, tags}` records.
    pub catalog_path: PathBuf,
    /// Where the quantized artifact is written. Overwritten on every run.
    pub output_path: PathBuf,
    /// Tags of the sample user profile ranked at the end of the run.
    pub query_tags: Vec<String>,
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub pairs: PairConfig,
    pub train: TrainConfig,
    pub recommend: RecommendConfig,
    pub export: ExportConfig,
}

impl Default for WayfarerConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("scripts/destinations.json"),
            output_path: PathBuf::from("assets/recommendation_model.wfq"),
            query_tags: vec!["trekking".to_string(), "mountains".to_string()],
            log_format: LogFormat::default(),
            log_level: "info".to_string(),
            pairs: PairConfig::default(),
            train: TrainConfig::default(),
            recommend: RecommendConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

impl WayfarerConfig {
    /// Load from the default file (or `path`) and the process environment,
    /// then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), but reads `WAYFARER__*` keys from `env`
    /// instead of the process environment when it is `Some`.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_FILE).required(false),
        };
        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("query_tags")
            .source(env);

        let cfg: WayfarerConfig = config::Config::builder()
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("catalog_path is empty".into()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("output_path is empty".into()));
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level is empty".into()));
        }
        self.pairs
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.train
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.export
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
