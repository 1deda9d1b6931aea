//! Inert fallback backend
//!
//! Selected when no inference engine is compiled in. It accepts any authorized artifact without
//! parsing it. `SegmentationModel` never postprocesses its output and hands the compositor an
//! all-pass mask instead, so every frame is left unchanged at any threshold. Called directly, it
//! emits saturating foreground logits.

use crate::config::ExecutionProvider;
use crate::error::{FilterError, Result};
use crate::inference::{BackendType, InferenceBackend, LoadReport};
use crate::utils::validation::TensorValidator;
use instant::Duration;
use ndarray::Array4;
use std::path::Path;

/// Logit emitted for every output pixel; `sigmoid(20.0)` rounds to 1.0 in `f32`
pub const FOREGROUND_LOGIT: f32 = 20.0;

/// Spatial size reported for input and output
pub const PASSTHROUGH_SIZE: usize = 320;

#[derive(Debug, Default)]
pub struct PassthroughBackend {
    initialized: bool,
}

impl PassthroughBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl InferenceBackend for PassthroughBackend {
    fn initialize(
        &mut self,
        model_path: &Path,
        _candidates: &[ExecutionProvider],
    ) -> Result<LoadReport> {
        tracing::warn!(
            model = %model_path.display(),
            "No inference engine compiled in, using passthrough backend (all-foreground mask)"
        );
        self.initialized = true;
        Ok(LoadReport {
            execution_provider: ExecutionProvider::Cpu,
            load_time: Duration::ZERO,
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(FilterError::inference("Passthrough backend not initialized"));
        }
        TensorValidator::validate_input_tensor(input)?;
        Ok(Array4::from_elem(
            (1, 1, PASSTHROUGH_SIZE, PASSTHROUGH_SIZE),
            FOREGROUND_LOGIT,
        ))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        (1, 3, PASSTHROUGH_SIZE, PASSTHROUGH_SIZE)
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        (1, 1, PASSTHROUGH_SIZE, PASSTHROUGH_SIZE)
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Passthrough
    }
}
