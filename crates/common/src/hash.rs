//! Content hashing and dedup keys.

use sha2::{Digest, Sha256};

use crate::{AppError, AppResult};

/// Maximum stored length of a file extension.
pub const MAX_EXTENSION_LEN: usize = 20;

/// The `(hash, size)` pair identifying byte-identical content.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// Lowercase hex SHA-256 of the content.
    pub hash: String,
    /// Content size in bytes.
    pub size: i64,
}

impl DedupKey {
    /// Compute the dedup key of in-memory content.
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            hash: hex::encode(Sha256::digest(data)),
            size: data.len() as i64,
        }
    }

    /// Build a dedup key from a client-supplied hash and size.
    ///
    /// The hash is normalized to lowercase.
    pub fn new(hash: &str, size: i64) -> AppResult<Self> {
        if !is_sha256_hex(hash) {
            return Err(AppError::Validation(format!(
                "file hash must be 64 hex characters, got {hash:?}"
            )));
        }
        if size < 0 {
            return Err(AppError::Validation(format!(
                "file size must not be negative, got {size}"
            )));
        }

        Ok(Self {
            hash: hash.to_ascii_lowercase(),
            size,
        })
    }
}

/// Check that a string is a hex-encoded SHA-256 digest.
#[must_use]
pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Extract the extension of a file name, lowercased.
///
/// Returns `None` for names without an extension, dot-files, and
/// extensions longer than [`MAX_EXTENSION_LEN`].
#[must_use]
pub fn file_extension(name: &str) -> Option<String> {
    name.rfind('.')
        .filter(|&pos| pos > 0 && pos < name.len() - 1)
        .map(|pos| &name[pos + 1..])
        .filter(|ext| ext.chars().count() <= MAX_EXTENSION_LEN)
        .map(str::to_lowercase)
}
