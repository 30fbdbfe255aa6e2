use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the pretrained ONNX classification model.
    pub model_path: PathBuf,
    /// Path to the serialized tokenizer consumed by `tokenizers`.
    pub tokenizer_path: PathBuf,
    /// Optional expected SHA-256 of the model file; verified before loading.
    pub model_sha256: Option<String>,
    /// Optional expected SHA-256 of the tokenizer file; verified before loading.
    pub tokenizer_sha256: Option<String>,
    /// Optional CSV of historical labeled data. When set, the label set is the
    /// unique values of `labels_column`; otherwise the built-in role list is used.
    pub labels_csv: Option<PathBuf>,
    pub labels_column: String,
    /// Fixed token-sequence length the model was trained with.
    pub max_sequence_length: usize,
    /// ONNX input/output tensor names. Default: the first names declared by the graph.
    pub input_name: Option<String>,
    pub output_name: Option<String>,
    pub pad_token: String,
    pub pad_id: u32,
    pub unk_token: String,
    /// Directory uploaded resumes are written to before processing.
    pub upload_dir: PathBuf,
    /// When true, processed uploads are kept on disk instead of deleted.
    pub keep_uploads: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            model_path: require_env("MODEL_PATH")?.into(),
            tokenizer_path: require_env("TOKENIZER_PATH")?.into(),
            model_sha256: optional_env("MODEL_SHA256"),
            tokenizer_sha256: optional_env("TOKENIZER_SHA256"),
            labels_csv: optional_env("LABELS_CSV").map(PathBuf::from),
            labels_column: optional_env("LABELS_COLUMN").unwrap_or_else(|| "Category".to_string()),
            max_sequence_length: parsed_env("MAX_SEQUENCE_LENGTH", 500)?,
            input_name: optional_env("MODEL_INPUT_NAME"),
            output_name: optional_env("MODEL_OUTPUT_NAME"),
            pad_token: optional_env("PAD_TOKEN").unwrap_or_else(|| "[PAD]".to_string()),
            pad_id: parsed_env("PAD_ID", 0u32)?,
            unk_token: optional_env("UNK_TOKEN").unwrap_or_else(|| "[UNK]".to_string()),
            upload_dir: optional_env("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            keep_uploads: optional_env("KEEP_UPLOADS")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            port: parsed_env("PORT", 8080u16)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and empty values are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        None => Ok(default),
    }
}
