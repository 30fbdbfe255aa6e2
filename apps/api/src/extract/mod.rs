//! PDF text extraction.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to parse PDF: {0}")]
    Pdf(#[from] pdf_extract::OutputError),

    #[error("no extractable text in PDF")]
    NoText,
}

/// Reads the PDF at `path` and returns the concatenated text of all pages,
/// trimmed of leading and trailing whitespace.
///
/// A document with no extractable text (scanned or image-only) yields
/// [`ExtractError::NoText`]; an unparseable file yields [`ExtractError::Pdf`].
/// Callers surface both as a user-input error, never a crash.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let raw = pdf_extract::extract_text(path)?;
    non_empty(&raw).ok_or(ExtractError::NoText)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
