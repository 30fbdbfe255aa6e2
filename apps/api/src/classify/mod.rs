//! Resume classification: pretrained tokenizer + model + label decoding.

mod artefact;
mod labels;
mod onnx;

pub use artefact::Artefact;
pub use labels::{LabelSet, LabelSetError, PredictionResult, RolePrediction, TopRoles};
pub use onnx::{OnnxClassifierConfig, OnnxRoleClassifier};

use std::path::PathBuf;

use thiserror::Error;

/// A pretrained classifier mapping resume text to a probability vector over
/// the configured label set.
///
/// Carried in `AppState` as `Arc<dyn RoleClassifier>` so the ONNX engine can
/// be swapped for a mock in tests.
pub trait RoleClassifier: Send + Sync {
    /// Runs preprocessing and the model forward pass for a single resume text.
    ///
    /// The returned vector has one entry per model output class, each in
    /// [0, 1]. Text that tokenizes to no recognized words is
    /// [`ClassifierError::NoKnownTokens`], distinct from any runtime failure.
    fn predict(&self, text: &str) -> Result<Vec<f32>, ClassifierError>;
}

/// Errors produced while loading or running the classifier.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("failed to read artifact at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact at {path} expected SHA-256 {expected} but found {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("failed to load tokenizer from {path}: {source}")]
    LoadTokenizer {
        path: PathBuf,
        #[source]
        source: tokenizers::Error,
    },

    #[error("failed to configure tokenizer truncation: {0}")]
    ConfigureTruncation(#[source] tokenizers::Error),

    #[error("failed to construct ONNX session builder: {0}")]
    CreateSessionBuilder(#[source] ort::Error),

    #[error("failed to create ONNX session: {0}")]
    CreateSession(#[source] ort::Error),

    #[error("model at {path} declares no {kind} tensors")]
    MissingTensorName { path: PathBuf, kind: &'static str },

    #[error("classifier requires max_sequence_length > 0")]
    ZeroSequenceLength,

    #[error("failed to encode text: {0}")]
    Encode(#[source] tokenizers::Error),

    #[error("tokenizer produced sequence of length {actual} but expected {expected}")]
    SequenceLength { expected: usize, actual: usize },

    #[error("no valid words found in resume")]
    NoKnownTokens,

    #[error("failed to convert encoded text into tensor: {0}")]
    EncodeTensor(#[source] ort::Error),

    #[error("session mutex was poisoned by a previous panic")]
    SessionPoisoned,

    #[error("failed to run inference: {0}")]
    Inference(#[source] ort::Error),

    #[error("ONNX output \"{name}\" missing from session results")]
    OutputMissing { name: String },
}
