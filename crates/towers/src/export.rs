//! Quantized model artifacts.
//!
//! Layout of an artifact file:
//!
//! | bytes | content                                    |
//! |-------|--------------------------------------------|
//! | 0..4  | magic `WFQM`                               |
//! | 4..6  | format version, `u16` little-endian        |
//! | 6     | `1` when the payload is zstd compressed    |
//! | 7..   | bincode-encoded [`ModelArtifact`]          |
//!
//! Kernels are stored as int8 with one symmetric scale per tensor. Biases
//! and the scalar output layer stay `f32`.

use std::fs;
use std::path::Path;
use std::time::Instant;

use catalog::TagVocabulary;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn, Level};

use crate::model::TwoTowerModel;

pub const ARTIFACT_MAGIC: [u8; 4] = *b"WFQM";
pub const ARTIFACT_VERSION: u16 = 1;
const HEADER_LEN: usize = 7;

/// Serializes a trained scorer into artifact bytes.
pub trait Exporter {
    type Model;

    fn export(&self, model: &Self::Model, vocabulary: &TagVocabulary)
        -> Result<Vec<u8>, ExportError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("invalid export config: {0}")]
    InvalidConfig(String),
    #[error("model expects {model} input slots but the vocabulary has {vocabulary}")]
    VocabularyMismatch { model: usize, vocabulary: usize },
    #[error("inconsistent tensor shapes: {0}")]
    Shape(String),
    #[error("failed to encode artifact: {0}")]
    Encode(String),
    #[error("failed to decode artifact: {0}")]
    Decode(String),
    #[error("zstd failure: {0}")]
    Compression(String),
    #[error("artifact is shorter than its {HEADER_LEN}-byte header")]
    Truncated,
    #[error("not a wayfarer model artifact")]
    BadMagic,
    #[error("unsupported artifact version {0}")]
    UnsupportedVersion(u16),
    #[error("failed to write artifact {path}: {message}")]
    Io { path: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// zstd-compress the payload.
    pub compress: bool,
    /// zstd level, 1..=22.
    pub level: i32,
}

impl ExportConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if self.compress && !(1..=22).contains(&self.level) {
            return Err(ExportError::InvalidConfig(format!(
                "zstd level must be in 1..=22 (got {})",
                self.level
            )));
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            compress: true,
            level: 3,
        }
    }
}

/// Int8 tensor with a single symmetric scale: `value ≈ q * scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedTensor {
    pub rows: usize,
    pub cols: usize,
    pub scale: f32,
    pub values: Vec<i8>,
}

impl QuantizedTensor {
    pub fn quantize(tensor: &Array2<f32>) -> Self {
        let (rows, cols) = tensor.dim();
        let max_abs = tensor.iter().fold(0.0f32, |acc, w| acc.max(w.abs()));
        let scale = if max_abs > 0.0 { max_abs / 127.0 } else { 1.0 };
        let values = tensor
            .iter()
            .map(|&w| (w / scale).round().clamp(-127.0, 127.0) as i8)
            .collect();
        Self {
            rows,
            cols,
            scale,
            values,
        }
    }

    pub fn dequantize(&self) -> Result<Array2<f32>, ExportError> {
        let data = self.values.iter().map(|&q| f32::from(q) * self.scale).collect();
        Array2::from_shape_vec((self.rows, self.cols), data).map_err(|e| {
            ExportError::Shape(format!(
                "{}x{} tensor with {} values: {e}",
                self.rows,
                self.cols,
                self.values.len()
            ))
        })
    }
}

/// Decoded artifact payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub vocabulary: TagVocabulary,
    pub embedding_dim: usize,
    pub user_kernel: QuantizedTensor,
    pub user_bias: Vec<f32>,
    pub dest_kernel: QuantizedTensor,
    pub dest_bias: Vec<f32>,
    pub out_weight: f32,
    pub out_bias: f32,
}

impl ModelArtifact {
    pub fn from_model(
        model: &TwoTowerModel,
        vocabulary: &TagVocabulary,
    ) -> Result<Self, ExportError> {
        if model.input_dim() != vocabulary.len() {
            return Err(ExportError::VocabularyMismatch {
                model: model.input_dim(),
                vocabulary: vocabulary.len(),
            });
        }
        let (out_weight, out_bias) = model.output_layer();
        Ok(Self {
            vocabulary: vocabulary.clone(),
            embedding_dim: model.embedding_dim(),
            user_kernel: QuantizedTensor::quantize(model.user_kernel()),
            user_bias: model.user_bias().to_vec(),
            dest_kernel: QuantizedTensor::quantize(model.dest_kernel()),
            dest_bias: model.dest_bias().to_vec(),
            out_weight,
            out_bias,
        })
    }

    /// Header plus payload, compressed according to `cfg`.
    pub fn to_bytes(&self, cfg: &ExportConfig) -> Result<Vec<u8>, ExportError> {
        cfg.validate()?;
        let payload = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| ExportError::Encode(e.to_string()))?;
        let payload = if cfg.compress {
            zstd::encode_all(&payload[..], cfg.level)
                .map_err(|e| ExportError::Compression(e.to_string()))?
        } else {
            payload
        };

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(&ARTIFACT_MAGIC);
        out.extend_from_slice(&ARTIFACT_VERSION.to_le_bytes());
        out.push(u8::from(cfg.compress));
        out.extend_from_slice(&payload);
        Ok(out)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExportError> {
        if bytes.len() < HEADER_LEN {
            return Err(ExportError::Truncated);
        }
        if bytes[..4] != ARTIFACT_MAGIC {
            return Err(ExportError::BadMagic);
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != ARTIFACT_VERSION {
            return Err(ExportError::UnsupportedVersion(version));
        }

        let body = &bytes[HEADER_LEN..];
        let payload = match bytes[6] {
            0 => body.to_vec(),
            1 => zstd::decode_all(body).map_err(|e| ExportError::Compression(e.to_string()))?,
            flag => return Err(ExportError::Decode(format!("unknown compression flag {flag}"))),
        };
        let (artifact, _): (Self, usize) =
            bincode::serde::decode_from_slice(&payload, bincode::config::standard())
                .map_err(|e| ExportError::Decode(e.to_string()))?;
        Ok(artifact)
    }

    /// Rebuild a float model from the quantized tensors.
    pub fn dequantize(&self) -> Result<TwoTowerModel, ExportError> {
        let vocab = self.vocabulary.len();
        for (name, t) in [("user", &self.user_kernel), ("destination", &self.dest_kernel)] {
            if t.rows != vocab || t.cols != self.embedding_dim {
                return Err(ExportError::Shape(format!(
                    "{name} kernel is {}x{}, expected {vocab}x{}",
                    t.rows, t.cols, self.embedding_dim
                )));
            }
        }
        TwoTowerModel::from_parts(
            self.user_kernel.dequantize()?,
            Array1::from_vec(self.user_bias.clone()),
            self.dest_kernel.dequantize()?,
            Array1::from_vec(self.dest_bias.clone()),
            self.out_weight,
            self.out_bias,
        )
        .map_err(|e| ExportError::Shape(e.to_string()))
    }
}

/// Int8 exporter for [`TwoTowerModel`].
#[derive(Debug, Clone, Default)]
pub struct QuantizedExporter {
    cfg: ExportConfig,
}

impl QuantizedExporter {
    pub fn new(cfg: ExportConfig) -> Self {
        Self { cfg }
    }
}

impl Exporter for QuantizedExporter {
    type Model = TwoTowerModel;

    fn export(
        &self,
        model: &TwoTowerModel,
        vocabulary: &TagVocabulary,
    ) -> Result<Vec<u8>, ExportError> {
        let start = Instant::now();
        let span = tracing::span!(
            Level::INFO,
            "towers.export",
            compress = self.cfg.compress,
            level = self.cfg.level
        );
        let _guard = span.enter();

        let result =
            ModelArtifact::from_model(model, vocabulary).and_then(|a| a.to_bytes(&self.cfg));
        match &result {
            Ok(bytes) => info!(
                bytes = bytes.len(),
                parameters = model.parameter_count(),
                elapsed_micros = start.elapsed().as_micros(),
                "export_success"
            ),
            Err(err) => warn!(error = %err, "export_failure"),
        }
        result
    }
}

/// Write artifact bytes to `path`, creating parent directories and
/// replacing any existing file.
pub fn write_artifact<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ExportError> {
    let path = path.as_ref();
    let io_err = |e: std::io::Error| ExportError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)?;
    info!(path = %path.display(), bytes = bytes.len(), "artifact_written");
    Ok(())
}

/// Read and decode an artifact file.
pub fn read_artifact<P: AsRef<Path>>(path: P) -> Result<ModelArtifact, ExportError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    ModelArtifact::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use recommend::Scorer;

    fn vocab(n: usize) -> TagVocabulary {
        TagVocabulary::from_tags((0..n).map(|i| format!("tag{i:02}")))
    }

    #[test]
    fn quantize_uses_symmetric_per_tensor_scale() {
        let t = array![[0.5f32, -1.27], [0.0, 1.27]];
        let q = QuantizedTensor::quantize(&t);
        assert!((q.scale - 0.01).abs() < 1e-6);
        assert_eq!(q.values, vec![50, -127, 0, 127]);
        let back = q.dequantize().unwrap();
        for (a, b) in t.iter().zip(back.iter()) {
            assert!((a - b).abs() <= q.scale / 2.0 + 1e-6);
        }
    }

    #[test]
    fn all_zero_tensor_gets_unit_scale() {
        let q = QuantizedTensor::quantize(&Array2::zeros((2, 3)));
        assert_eq!(q.scale, 1.0);
        assert!(q.values.iter().all(|&v| v == 0));
    }

    #[test]
    fn artifact_roundtrip_scores_close_to_float_model() {
        let model = TwoTowerModel::new(8, 16, 42);
        let vocabulary = vocab(8);
        for cfg in [ExportConfig::default(), ExportConfig::new().with_compress(false)] {
            let bytes = QuantizedExporter::new(cfg).export(&model, &vocabulary).unwrap();
            let artifact = ModelArtifact::from_bytes(&bytes).unwrap();
            assert_eq!(artifact.vocabulary, vocabulary);
            assert_eq!(artifact.embedding_dim, 16);

            let restored = artifact.dequantize().unwrap();
            for bits in 0..256u32 {
                let v: Vec<f32> = (0..8).map(|i| ((bits >> i) & 1) as f32).collect();
                let user: Vec<f32> = v.iter().rev().copied().collect();
                let diff = (model.score(&user, &v) - restored.score(&user, &v)).abs();
                assert!(diff < 0.05, "bits {bits}: diff {diff}");
            }
        }
    }

    #[test]
    fn header_has_magic_version_and_flag() {
        let model = TwoTowerModel::new(3, 2, 1);
        let bytes = QuantizedExporter::default().export(&model, &vocab(3)).unwrap();
        assert_eq!(&bytes[..4], b"WFQM");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), ARTIFACT_VERSION);
        assert_eq!(bytes[6], 1);
    }

    #[test]
    fn export_is_deterministic() {
        let model = TwoTowerModel::new(5, 4, 9);
        let exporter = QuantizedExporter::default();
        let a = exporter.export(&model, &vocab(5)).unwrap();
        let b = exporter.export(&model, &vocab(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn corrupted_artifacts_are_rejected() {
        let model = TwoTowerModel::new(3, 2, 1);
        let bytes = QuantizedExporter::default().export(&model, &vocab(3)).unwrap();

        assert_eq!(ModelArtifact::from_bytes(&bytes[..3]), Err(ExportError::Truncated));

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(ModelArtifact::from_bytes(&bad), Err(ExportError::BadMagic));

        let mut bad = bytes.clone();
        bad[4..6].copy_from_slice(&9u16.to_le_bytes());
        assert_eq!(ModelArtifact::from_bytes(&bad), Err(ExportError::UnsupportedVersion(9)));

        let mut bad = bytes.clone();
        bad[6] = 7;
        assert!(matches!(ModelArtifact::from_bytes(&bad), Err(ExportError::Decode(_))));

        let mut bad = bytes[..HEADER_LEN].to_vec();
        bad[6] = 0;
        bad.extend_from_slice(&[0xff; 4]);
        assert!(matches!(ModelArtifact::from_bytes(&bad), Err(ExportError::Decode(_))));
    }

    #[test]
    fn damaged_compressed_body_is_compression_error() {
        let model = TwoTowerModel::new(3, 2, 1);
        let bytes = QuantizedExporter::default().export(&model, &vocab(3)).unwrap();
        assert_eq!(bytes[6], 1);

        let mut bad = bytes[..HEADER_LEN].to_vec();
        bad.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            ModelArtifact::from_bytes(&bad),
            Err(ExportError::Compression(_))
        ));
    }

    #[test]
    fn inconsistent_shapes_fail_dequantize() {
        let model = TwoTowerModel::new(3, 2, 1);
        let artifact = ModelArtifact::from_model(&model, &vocab(3)).unwrap();
        assert!(artifact.dequantize().is_ok());

        let mut bad = artifact.clone();
        bad.dest_kernel.rows = 4;
        match bad.dequantize() {
            Err(ExportError::Shape(msg)) => assert!(msg.starts_with("destination kernel is 4x2")),
            other => panic!("expected shape error, got {other:?}"),
        }

        let mut bad = artifact.clone();
        bad.user_kernel.values.pop();
        assert!(matches!(bad.dequantize(), Err(ExportError::Shape(_))));

        let mut bad = artifact;
        bad.user_bias.push(0.0);
        match bad.dequantize() {
            Err(ExportError::Shape(msg)) => assert!(msg.contains("user_bias"), "{msg}"),
            other => panic!("expected shape error, got {other:?}"),
        }
    }

    #[test]
    fn vocabulary_mismatch_is_rejected() {
        let model = TwoTowerModel::new(3, 2, 1);
        let err = QuantizedExporter::default().export(&model, &vocab(4)).unwrap_err();
        assert_eq!(
            err,
            ExportError::VocabularyMismatch {
                model: 3,
                vocabulary: 4
            }
        );
    }

    #[test]
    fn bad_level_is_rejected() {
        let cfg = ExportConfig::new().with_level(0);
        assert!(matches!(cfg.validate(), Err(ExportError::InvalidConfig(_))));
        assert!(ExportConfig::new().with_compress(false).with_level(0).validate().is_ok());
    }

    #[test]
    fn write_artifact_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assets").join("model.wfq");
        write_artifact(&path, b"first").unwrap();
        write_artifact(&path, b"second").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn read_artifact_roundtrips_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.wfq");
        let model = TwoTowerModel::new(4, 3, 2);
        let bytes = QuantizedExporter::default().export(&model, &vocab(4)).unwrap();
        write_artifact(&path, &bytes).unwrap();
        let artifact = read_artifact(&path).unwrap();
        assert_eq!(artifact.dequantize().unwrap().input_dim(), 4);
    }
}
