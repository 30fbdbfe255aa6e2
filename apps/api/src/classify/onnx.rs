use std::sync::Mutex;

use ort::{session::Session, value::TensorRef};
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

use super::{Artefact, ClassifierError, RoleClassifier};

/// Configuration for the ONNX-backed role classifier.
#[derive(Debug, Clone)]
pub struct OnnxClassifierConfig {
    /// Model artifact (ONNX graph) to load.
    pub model: Artefact,
    /// Tokenizer artifact consumed by `tokenizers`.
    pub tokenizer: Artefact,
    /// Name of the token-ID input tensor. Default: the first input declared
    /// by the graph.
    pub input_name: Option<String>,
    /// Name of the probability output tensor. Default: the first output
    /// declared by the graph.
    pub output_name: Option<String>,
    /// Token count the model accepts. Inputs are padded and truncated to
    /// this size. Must be greater than zero.
    pub max_sequence_length: usize,
    /// Token inserted when padding shorter sequences.
    pub pad_token: String,
    /// Identifier of the padding token.
    pub pad_id: u32,
    /// Token unrecognized words map to. Positions holding it carry no signal.
    pub unk_token: String,
}

/// Pretrained ONNX classifier behind the [`RoleClassifier`] seam.
///
/// The tokenizer and session are loaded once and shared read-only across
/// requests; the session itself is serialized behind a mutex, so concurrent
/// requests queue on the forward pass.
pub struct OnnxRoleClassifier {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    input_name: String,
    output_name: String,
    max_sequence_length: usize,
    pad_id: u32,
    unk_id: Option<u32>,
}

impl OnnxRoleClassifier {
    /// Builds the classifier from disk artifacts, verifying checksums when
    /// they are configured.
    pub fn new(config: OnnxClassifierConfig) -> Result<Self, ClassifierError> {
        if config.max_sequence_length == 0 {
            return Err(ClassifierError::ZeroSequenceLength);
        }

        config.model.verify()?;
        config.tokenizer.verify()?;

        let mut tokenizer = Tokenizer::from_file(&config.tokenizer.path).map_err(|source| {
            ClassifierError::LoadTokenizer {
                path: config.tokenizer.path.clone(),
                source,
            }
        })?;
        configure_tokenizer(
            &mut tokenizer,
            config.max_sequence_length,
            &config.pad_token,
            config.pad_id,
        )?;
        let unk_id = tokenizer.token_to_id(&config.unk_token);

        let session = Session::builder()
            .map_err(ClassifierError::CreateSessionBuilder)?
            .commit_from_file(&config.model.path)
            .map_err(ClassifierError::CreateSession)?;

        let input_name = match config.input_name {
            Some(name) => name,
            None => session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| ClassifierError::MissingTensorName {
                    path: config.model.path.clone(),
                    kind: "input",
                })?,
        };
        let output_name = match config.output_name {
            Some(name) => name,
            None => session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or_else(|| ClassifierError::MissingTensorName {
                    path: config.model.path.clone(),
                    kind: "output",
                })?,
        };

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            input_name,
            output_name,
            max_sequence_length: config.max_sequence_length,
            pad_id: config.pad_id,
            unk_id,
        })
    }

    /// Probes the model's output dimensionality with a padding-only batch.
    ///
    /// Run once at startup so a model/label-set mismatch aborts the process
    /// instead of being clamped per request.
    pub fn output_dimension(&self) -> Result<usize, ClassifierError> {
        let ids = vec![i64::from(self.pad_id); self.max_sequence_length];
        Ok(self.forward(&ids)?.len())
    }

    /// Runs a single-item batch through the session.
    fn forward(&self, ids: &[i64]) -> Result<Vec<f32>, ClassifierError> {
        let tensor = TensorRef::from_array_view(([1usize, self.max_sequence_length], ids))
            .map_err(ClassifierError::EncodeTensor)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::SessionPoisoned)?;

        let input_name = self.input_name.as_str();
        let outputs = session
            .run(ort::inputs! {
                input_name => tensor,
            })
            .map_err(ClassifierError::Inference)?;

        let value = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ClassifierError::OutputMissing {
                name: self.output_name.clone(),
            })?;
        let (_, probabilities) = value
            .try_extract_tensor::<f32>()
            .map_err(ClassifierError::Inference)?;

        Ok(probabilities.to_vec())
    }
}

impl RoleClassifier for OnnxRoleClassifier {
    fn predict(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let lowered = text.to_lowercase();
        let encoding = self
            .tokenizer
            .encode(lowered.as_str(), true)
            .map_err(ClassifierError::Encode)?;

        let ids = encoding.get_ids();
        let attention = encoding.get_attention_mask();
        if ids.len() != self.max_sequence_length {
            return Err(ClassifierError::SequenceLength {
                expected: self.max_sequence_length,
                actual: ids.len(),
            });
        }

        if known_token_count(ids, attention, self.pad_id, self.unk_id) == 0 {
            return Err(ClassifierError::NoKnownTokens);
        }

        let ids_vec: Vec<i64> = ids.iter().map(|id| i64::from(*id)).collect();
        self.forward(&ids_vec)
    }
}

/// Fixed right-padding and right-truncation to the model's sequence length,
/// matching the preprocessing the model was trained with.
fn configure_tokenizer(
    tokenizer: &mut Tokenizer,
    max_sequence_length: usize,
    pad_token: &str,
    pad_id: u32,
) -> Result<(), ClassifierError> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_sequence_length,
            strategy: TruncationStrategy::OnlyFirst,
            stride: 0,
            direction: TruncationDirection::Right,
        }))
        .map_err(ClassifierError::ConfigureTruncation)?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::Fixed(max_sequence_length),
        direction: PaddingDirection::Right,
        pad_to_multiple_of: None,
        pad_id,
        pad_type_id: 0,
        pad_token: pad_token.to_string(),
    }));

    Ok(())
}

/// Counts positions that carry signal: attended tokens whose ID is neither
/// the padding ID nor the unknown-word ID. A zero count means the vocabulary
/// recognized nothing in the input.
fn known_token_count(ids: &[u32], attention: &[u32], pad_id: u32, unk_id: Option<u32>) -> usize {
    ids.iter()
        .zip(attention)
        .filter(|(id, mask)| **mask == 1 && **id != pad_id && Some(**id) != unk_id)
        .count()
}
