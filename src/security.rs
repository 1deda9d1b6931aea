//! Model artifact gate
//!
//! Every model file passes through [`ModelIntegrityGate::authorize`] before an inference engine
//! is allowed to open it. Checks run in a fixed order and stop at the first failure:
//!
//! 1. no `..` component in the supplied path
//! 2. the path canonicalizes
//! 3. the canonical path lies inside an allow-listed base directory
//! 4. it names an existing regular file
//! 5. its size does not exceed the policy maximum
//! 6. its extension matches (warning only)
//! 7. its SHA-256 matches the expected digest, when one is configured

use crate::error::{FilterError, Result};
use crate::utils::validation::{IntegrityChecker, PathValidator};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest model artifact the gate accepts (500 MiB)
pub const MAX_MODEL_SIZE: u64 = 500 * 1024 * 1024;

/// Expected model file extension
pub const MODEL_EXTENSION: &str = "onnx";

/// Plugin directory name used in the default allow-list
const PLUGIN_NAME: &str = "obs-background-filter";

/// Where model artifacts may come from and what they must look like
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    pub allowed_dirs: Vec<PathBuf>,
    pub max_size: u64,
    pub expected_extension: String,
    pub expected_sha256: Option<String>,
}

impl SecurityPolicy {
    /// Policy with an explicit allow-list and default limits
    #[must_use]
    pub fn new(allowed_dirs: Vec<PathBuf>) -> Self {
        Self {
            allowed_dirs,
            max_size: MAX_MODEL_SIZE,
            expected_extension: MODEL_EXTENSION.to_string(),
            expected_sha256: None,
        }
    }

    /// The plugin's fixed allow-list: the user plugin data directory plus the system-wide
    /// plugin model directories
    #[must_use]
    pub fn plugin_default() -> Self {
        let mut allowed_dirs = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            let data = config_dir
                .join("obs-studio")
                .join("plugins")
                .join(PLUGIN_NAME)
                .join("data");
            allowed_dirs.push(data.join("models"));
            allowed_dirs.push(data);
        }
        allowed_dirs.push(PathBuf::from(format!("/usr/share/obs/obs-plugins/{PLUGIN_NAME}/models")));
        allowed_dirs.push(PathBuf::from(format!(
            "/usr/local/share/obs/obs-plugins/{PLUGIN_NAME}/models"
        )));
        Self::new(allowed_dirs)
    }

    #[must_use]
    pub fn with_allowed_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.allowed_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// Require a content digest; blank strings are treated as "no digest"
    #[must_use]
    pub fn with_expected_sha256<S: Into<String>>(mut self, digest: Option<S>) -> Self {
        self.expected_sha256 = digest
            .map(Into::into)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::plugin_default()
    }
}

/// Proof that an artifact passed the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Canonical location that was checked; load from here
    pub canonical_path: PathBuf,
    pub size: u64,
    /// Lower-case hex digest, when one was computed
    pub sha256: Option<String>,
    /// `false` when no expected digest was configured
    pub verified: bool,
}

/// Path and content checks for model artifacts
pub struct ModelIntegrityGate;

impl ModelIntegrityGate {
    /// Run every check against `path`
    ///
    /// # Errors
    /// `PathSecurity` for traversal, canonicalization or allow-list failures; `Integrity` for a
    /// missing, non-regular, oversized or checksum-mismatched file; `Io` when hashing fails.
    pub fn authorize<P: AsRef<Path>>(path: P, policy: &SecurityPolicy) -> Result<Authorization> {
        let path = path.as_ref();
        let result = Self::run_checks(path, policy);
        if let Err(e) = &result {
            warn!(path = %path.display(), "Model rejected: {}", e);
        }
        result
    }

    fn run_checks(path: &Path, policy: &SecurityPolicy) -> Result<Authorization> {
        PathValidator::reject_traversal(path)?;

        let canonical_path = PathValidator::canonicalize(path)?;

        if !Self::is_allowed(&canonical_path, policy) {
            return Err(FilterError::path_security(format!(
                "Model path is outside the allowed directories: {}",
                canonical_path.display()
            )));
        }

        let size = PathValidator::validate_regular_file(&canonical_path)?;

        if size > policy.max_size {
            return Err(FilterError::integrity(format!(
                "Model file too large: {} bytes (max {} bytes)",
                size, policy.max_size
            )));
        }

        if let Err(e) = PathValidator::validate_extension(&canonical_path, &policy.expected_extension)
        {
            warn!("Unexpected model file extension: {}", e);
        }

        let (sha256, verified) = match policy.expected_sha256.as_deref() {
            Some(expected) => {
                let actual = IntegrityChecker::sha256_file(&canonical_path)?;
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(FilterError::integrity(format!(
                        "Checksum mismatch for {}: expected {}, got {}",
                        canonical_path.display(),
                        expected.to_lowercase(),
                        actual
                    )));
                }
                (Some(actual), true)
            },
            None => {
                warn!(
                    path = %canonical_path.display(),
                    "No checksum configured, model integrity is unverified"
                );
                (None, false)
            },
        };

        info!(
            path = %canonical_path.display(),
            size,
            verified,
            "Model file authorized"
        );

        Ok(Authorization {
            canonical_path,
            size,
            sha256,
            verified,
        })
    }

    /// Canonical containment against each allow-listed base that exists
    fn is_allowed(canonical_path: &Path, policy: &SecurityPolicy) -> bool {
        policy.allowed_dirs.iter().any(|dir| match std::fs::canonicalize(dir) {
            Ok(base) => PathValidator::is_canonical_path_in_directory(canonical_path, &base),
            Err(_) => {
                debug!(dir = %dir.display(), "Allowed directory does not resolve, skipping");
                false
            },
        })
    }
}
