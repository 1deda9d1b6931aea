//! Segmentation model ownership and the load / infer contract

use crate::config::ExecutionProvider;
use crate::error::{FilterError, Result};
use crate::inference::{BackendFactory, BackendType, DefaultBackendFactory, InferenceBackend};
use crate::postprocess::MaskPostprocessor;
use crate::security::{ModelIntegrityGate, SecurityPolicy};
use crate::types::{SegmentationMask, WorkImage};
use crate::utils::preprocessing::{ImagePreprocessor, PreprocessingConfig};
use crate::utils::validation::NumericValidator;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// A fully initialized inference engine bound to one authorized artifact
pub struct ModelHandle {
    backend: Box<dyn InferenceBackend>,
    backend_type: BackendType,
    execution_provider: ExecutionProvider,
    input_size: (u32, u32),
    output_size: (u32, u32),
    model_path: PathBuf,
    verified: bool,
}

impl ModelHandle {
    #[must_use]
    pub fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    #[must_use]
    pub fn execution_provider(&self) -> ExecutionProvider {
        self.execution_provider
    }

    /// Model input spatial size `(width, height)`
    #[must_use]
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Declared output spatial size `(width, height)`
    #[must_use]
    pub fn output_size(&self) -> (u32, u32) {
        self.output_size
    }

    /// Canonical path the engine was loaded from
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Whether the artifact's checksum was verified at load
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("backend_type", &self.backend_type)
            .field("execution_provider", &self.execution_provider)
            .field("input_size", &self.input_size)
            .field("output_size", &self.output_size)
            .field("model_path", &self.model_path)
            .field("verified", &self.verified)
            .finish_non_exhaustive()
    }
}

/// Load state of a [`SegmentationModel`]
#[derive(Debug, Default)]
pub enum ModelState {
    #[default]
    Unloaded,
    Loaded(ModelHandle),
}

/// Owns at most one loaded model and runs per-frame inference on it
pub struct SegmentationModel {
    state: ModelState,
    factory: Box<dyn BackendFactory>,
    candidates: Vec<ExecutionProvider>,
    preprocessing: PreprocessingConfig,
}

impl SegmentationModel {
    /// Unloaded model using the compiled-in backends and the default provider order
    #[must_use]
    pub fn new() -> Self {
        Self::with_factory(Box::new(DefaultBackendFactory))
    }

    #[must_use]
    pub fn with_factory(factory: Box<dyn BackendFactory>) -> Self {
        Self {
            state: ModelState::Unloaded,
            factory,
            candidates: ExecutionProvider::default_candidates(),
            preprocessing: PreprocessingConfig::default(),
        }
    }

    /// Replace the ordered execution-provider candidate list
    #[must_use]
    pub fn with_execution_providers(mut self, candidates: Vec<ExecutionProvider>) -> Self {
        if candidates.is_empty() {
            warn!("Empty execution provider list, keeping defaults");
        } else {
            self.candidates = candidates;
        }
        self
    }

    #[must_use]
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    #[must_use]
    pub fn handle(&self) -> Option<&ModelHandle> {
        match &self.state {
            ModelState::Loaded(handle) => Some(handle),
            ModelState::Unloaded => None,
        }
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// Drop the current engine, if any
    pub fn unload(&mut self) {
        if let ModelState::Loaded(handle) = std::mem::take(&mut self.state) {
            debug!(path = %handle.model_path.display(), "Model unloaded");
        }
    }

    /// Gate and load a model, reporting success as a flag
    ///
    /// Any previous model is released first, so a failed load always leaves the model unloaded.
    pub fn load_model(&mut self, path: &Path, policy: &SecurityPolicy) -> bool {
        match self.try_load(path, policy) {
            Ok(handle) => {
                info!(
                    backend = %handle.backend_type,
                    provider = %handle.execution_provider,
                    input = ?handle.input_size,
                    output = ?handle.output_size,
                    "Model loaded"
                );
                true
            },
            Err(e) => {
                error!(path = %path.display(), "Failed to load model: {}", e);
                false
            },
        }
    }

    /// Gate and load a model
    ///
    /// # Errors
    /// Gate rejections (`PathSecurity`, `Integrity`, `Io`) or engine failures (`Model`).
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn try_load(&mut self, path: &Path, policy: &SecurityPolicy) -> Result<&ModelHandle> {
        self.unload();

        let authorization = ModelIntegrityGate::authorize(path, policy)?;

        let backend_type = self.factory.preferred_backend();
        debug!(backend = %backend_type, candidates = ?self.candidates, "Selecting inference backend");
        let mut backend = self.factory.create_backend(backend_type)?;
        let report = backend.initialize(&authorization.canonical_path, &self.candidates)?;

        if !backend.is_initialized() {
            return Err(FilterError::model("Backend reported success but is not initialized"));
        }

        let (_, channels, in_h, in_w) = backend.input_shape();
        if channels != 3 {
            return Err(FilterError::model(format!(
                "Model input must have 3 channels, got {}",
                channels
            )));
        }
        let (_, out_channels, out_h, out_w) = backend.output_shape();
        if out_channels != 1 {
            return Err(FilterError::model(format!(
                "Model output must have 1 channel, got {}",
                out_channels
            )));
        }

        let handle = ModelHandle {
            backend_type: backend.backend_type(),
            backend,
            execution_provider: report.execution_provider,
            input_size: (
                NumericValidator::dimension_to_u32(in_w, "input width")?,
                NumericValidator::dimension_to_u32(in_h, "input height")?,
            ),
            output_size: (
                NumericValidator::dimension_to_u32(out_w, "output width")?,
                NumericValidator::dimension_to_u32(out_h, "output height")?,
            ),
            model_path: authorization.canonical_path,
            verified: authorization.verified,
        };

        self.state = ModelState::Loaded(handle);
        self.handle()
            .ok_or_else(|| FilterError::internal("Model state lost after load"))
    }

    /// Preprocess and execute, returning the raw `[1, 1, h, w]` logits
    ///
    /// # Errors
    /// `Inference` when no model is loaded or the engine fails.
    pub fn run_raw(&mut self, image: &WorkImage) -> Result<Array4<f32>> {
        let ModelState::Loaded(handle) = &mut self.state else {
            return Err(FilterError::inference("No model loaded"));
        };

        let input = ImagePreprocessor::preprocess(image, handle.input_size, &self.preprocessing)?;
        handle.backend.infer(&input)
    }

    /// Produce a frame-sized mask without edge smoothing
    ///
    /// # Errors
    /// `Inference` on any preprocessing, execution or postprocessing failure.
    pub fn infer(&mut self, image: &WorkImage, threshold: f32) -> Result<SegmentationMask> {
        self.infer_smoothed(image, threshold, None)
    }

    /// Produce a frame-sized mask, optionally smoothed with an odd Gaussian kernel
    ///
    /// The passthrough engine always yields an all-pass mask, whatever the threshold.
    ///
    /// # Errors
    /// `Inference` on any preprocessing, execution or postprocessing failure.
    pub fn infer_smoothed(
        &mut self,
        image: &WorkImage,
        threshold: f32,
        smoothing_kernel: Option<u32>,
    ) -> Result<SegmentationMask> {
        if self
            .handle()
            .is_some_and(|handle| handle.backend_type == BackendType::Passthrough)
        {
            let (width, height) = image.dimensions();
            return Ok(SegmentationMask::filled(width, height, 1.0));
        }

        let raw = self.run_raw(image)?;
        MaskPostprocessor::postprocess(&raw, image.dimensions(), threshold, smoothing_kernel)
    }
}

impl Default for SegmentationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SegmentationModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationModel")
            .field("state", &self.state)
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}
