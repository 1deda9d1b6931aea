//! Inference backend abstraction and backend selection

use crate::config::ExecutionProvider;
use crate::error::{FilterError, Result};
use ndarray::Array4;
use std::path::Path;

// Use instant crate for cross-platform time compatibility
use instant::Duration;

/// Inference engine implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// ONNX Runtime backend (supports GPU acceleration)
    Onnx,
    /// Tract backend (pure Rust, no external dependencies)
    Tract,
    /// Inert fallback producing an all-foreground mask
    Passthrough,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Onnx => write!(f, "onnx"),
            Self::Tract => write!(f, "tract"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "onnx" => Ok(Self::Onnx),
            "tract" => Ok(Self::Tract),
            "passthrough" | "none" => Ok(Self::Passthrough),
            other => Err(FilterError::config_validation(format!(
                "Unknown backend: {}. Supported backends: onnx, tract, passthrough",
                other
            ))),
        }
    }
}

/// What a successful [`InferenceBackend::initialize`] settled on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    /// Execution provider the engine is bound to
    pub execution_provider: ExecutionProvider,
    /// Wall time spent building the engine
    pub load_time: Duration,
}

/// Trait for inference backends
pub trait InferenceBackend: Send {
    /// Bind the engine to an already-authorized model file
    ///
    /// `candidates` is the ordered execution-provider preference list; the backend walks it and
    /// records the first provider it can use.
    ///
    /// # Errors
    /// - Model file cannot be parsed by the engine
    /// - No candidate execution provider could be initialized
    /// - Model inputs or outputs do not have the expected rank
    fn initialize(&mut self, model_path: &Path, candidates: &[ExecutionProvider])
        -> Result<LoadReport>;

    /// Run inference on a `[1, 3, H, W]` input tensor, returning raw `[1, 1, h, w]` logits
    ///
    /// # Errors
    /// - Backend not initialized
    /// - Model inference failures
    /// - Output tensor has an unexpected shape
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Expected input shape (N, C, H, W)
    fn input_shape(&self) -> (usize, usize, usize, usize);

    /// Expected output shape (N, C, H, W)
    fn output_shape(&self) -> (usize, usize, usize, usize);

    /// Check if backend is initialized
    fn is_initialized(&self) -> bool;

    /// Which engine this is
    fn backend_type(&self) -> BackendType;
}

/// Factory trait for creating inference backends
pub trait BackendFactory: Send + Sync {
    /// Create an uninitialized backend instance of the specified type
    ///
    /// # Errors
    /// Returns `FilterError::Model` for backend types not compiled into this build.
    fn create_backend(&self, backend_type: BackendType) -> Result<Box<dyn InferenceBackend>>;

    /// Backend types this factory can create, in preference order
    fn available_backends(&self) -> Vec<BackendType>;

    /// The preferred backend type
    fn preferred_backend(&self) -> BackendType {
        self.available_backends()
            .first()
            .copied()
            .unwrap_or(BackendType::Passthrough)
    }
}

/// Default backend factory: the first compiled-in engine wins (ONNX, then Tract, then passthrough)
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

impl BackendFactory for DefaultBackendFactory {
    fn create_backend(&self, backend_type: BackendType) -> Result<Box<dyn InferenceBackend>> {
        match backend_type {
            #[cfg(feature = "onnx")]
            BackendType::Onnx => Ok(Box::new(crate::backends::OnnxBackend::new())),
            #[cfg(feature = "tract")]
            BackendType::Tract => Ok(Box::new(crate::backends::TractBackend::new())),
            BackendType::Passthrough => Ok(Box::new(crate::backends::PassthroughBackend::new())),
            #[allow(unreachable_patterns)]
            other => Err(FilterError::model(format!(
                "{} backend not compiled into this build. Enable the '{}' feature",
                other, other
            ))),
        }
    }

    fn available_backends(&self) -> Vec<BackendType> {
        let mut backends = Vec::new();
        #[cfg(feature = "onnx")]
        backends.push(BackendType::Onnx);
        #[cfg(feature = "tract")]
        backends.push(BackendType::Tract);
        backends.push(BackendType::Passthrough);
        backends
    }
}
