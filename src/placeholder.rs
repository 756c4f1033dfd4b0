use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("invalid placeholder signature `{0}`: expected 64 hex characters")]
    InvalidSignature(String),
    #[error("unable to read placeholder list {path}: {message}")]
    Read { path: String, message: String },
}

/// Hex-encoded SHA-256 of the full content.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Exact-match blocklist of stock "no image available" graphics, keyed by
/// content hash. Novel placeholder art with a different hash is not caught.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderDetector {
    signatures: BTreeSet<String>,
}

impl PlaceholderDetector {
    pub fn new<I, S>(signatures: I) -> Result<Self, PlaceholderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut detector = Self::default();
        for signature in signatures {
            detector.insert(signature.as_ref())?;
        }
        Ok(detector)
    }

    /// Adds one signature. Blank input is ignored.
    pub fn insert(&mut self, signature: &str) -> Result<(), PlaceholderError> {
        let normalized = signature.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Ok(());
        }
        if normalized.len() != 64 || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(PlaceholderError::InvalidSignature(signature.trim().to_string()));
        }
        self.signatures.insert(normalized);
        Ok(())
    }

    /// Loads one signature per line; `#` starts a comment.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<(), PlaceholderError> {
        let raw = std::fs::read_to_string(path).map_err(|err| PlaceholderError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        for line in raw.lines() {
            let entry = line.split('#').next().unwrap_or("");
            self.insert(entry)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn is_placeholder(&self, bytes: &[u8]) -> bool {
        self.signatures.contains(&content_hash(bytes))
    }
}
