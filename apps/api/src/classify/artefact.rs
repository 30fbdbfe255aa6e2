use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};

use super::ClassifierError;

/// File-based model or tokenizer artifact with an optional recorded checksum.
///
/// The original deployment ships artifacts without digests, so verification
/// only runs when a checksum is configured.
#[derive(Debug, Clone)]
pub struct Artefact {
    /// Location of the artifact on disk.
    pub path: PathBuf,
    /// Expected SHA-256 checksum as lowercase hexadecimal, if recorded.
    pub sha256: Option<String>,
}

impl Artefact {
    /// Verifies the artifact checksum against the expected digest, when one
    /// is configured.
    pub fn verify(&self) -> Result<(), ClassifierError> {
        let Some(expected) = &self.sha256 else {
            return Ok(());
        };
        let actual = compute_sha256(&self.path)?;
        if actual == normalise_hex(expected) {
            Ok(())
        } else {
            Err(ClassifierError::ChecksumMismatch {
                path: self.path.clone(),
                expected: normalise_hex(expected),
                actual,
            })
        }
    }
}

/// Computes the SHA-256 digest of the file at `path`.
fn compute_sha256(path: &Path) -> Result<String, ClassifierError> {
    let file = File::open(path).map_err(|source| ClassifierError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|source| ClassifierError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

fn normalise_hex(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}
