//! Content integrity checks for model artifacts

use crate::error::{FilterError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer size used while hashing
pub const HASH_BUFFER_SIZE: usize = 8192;

/// SHA-256 hashing and checksum comparison
pub struct IntegrityChecker;

impl IntegrityChecker {
    /// Stream a file through SHA-256 and return the lower-case hex digest
    pub fn sha256_file<P: AsRef<Path>>(path: P) -> Result<String> {
        let path_ref = path.as_ref();
        let mut file = File::open(path_ref)
            .map_err(|e| FilterError::file_io_error("open file for hashing", path_ref, &e))?;

        let mut hasher = Sha256::new();
        let mut buffer = [0u8; HASH_BUFFER_SIZE];
        loop {
            let read = file
                .read(&mut buffer)
                .map_err(|e| FilterError::file_io_error("read file for hashing", path_ref, &e))?;
            if read == 0 {
                break;
            }
            hasher.update(buffer.get(..read).unwrap_or_default());
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Hash a byte slice (lower-case hex)
    #[must_use]
    pub fn sha256_bytes(data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    /// Whether a string is a well-formed 64-digit hex SHA-256 digest
    #[must_use]
    pub fn is_sha256_hex(value: &str) -> bool {
        value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
    }

    /// Compare a file's digest against an expected hex string, ignoring case
    ///
    /// An empty expected hash skips verification with a warning and returns `true`.
    pub fn verify_checksum<P: AsRef<Path>>(path: P, expected_hash: &str) -> Result<bool> {
        let path_ref = path.as_ref();
        let expected = expected_hash.trim();
        if expected.is_empty() {
            tracing::warn!(
                "No checksum provided for {}, skipping verification (insecure)",
                path_ref.display()
            );
            return Ok(true);
        }

        let actual = Self::sha256_file(path_ref)?;
        if actual.eq_ignore_ascii_case(expected) {
            Ok(true)
        } else {
            tracing::warn!(
                "File integrity check failed for {}: expected {}, got {}",
                path_ref.display(),
                expected,
                actual
            );
            Ok(false)
        }
    }
}
