//! Tract backend implementation
//!
//! Pure Rust inference with no native dependencies. Tract only executes on the CPU, so
//! accelerated candidates in the provider list are skipped.

use crate::config::ExecutionProvider;
use crate::error::{FilterError, Result};
use crate::inference::{BackendType, InferenceBackend, LoadReport};
use crate::utils::validation::TensorValidator;
use ndarray::Array4;
use std::path::Path;
use tract_onnx::prelude::*;

/// Type alias for the complex Tract model type to reduce complexity warnings
type TractModel = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

// Use instant crate for cross-platform time compatibility
use instant::Instant;

/// Spatial size pinned onto graphs whose input dimensions are symbolic
pub const DEFAULT_INPUT_SIZE: usize = 320;

/// Tract backend for running segmentation models
#[derive(Debug)]
pub struct TractBackend {
    model: Option<TractModel>,
    input_shape: (usize, usize, usize, usize),
    output_shape: (usize, usize, usize, usize),
}

impl TractBackend {
    /// List Tract execution providers with availability status and descriptions
    #[must_use]
    pub fn list_providers() -> Vec<(ExecutionProvider, bool, String)> {
        log::debug!("🔍 Tract Backend System Analysis:");
        log::debug!("  - Platform: {os}", os = std::env::consts::OS);
        log::debug!("  - Architecture: {arch}", arch = std::env::consts::ARCH);

        vec![(
            ExecutionProvider::Cpu,
            true,
            "Pure Rust CPU inference with no external dependencies".to_string(),
        )]
    }

    /// Create a new uninitialized Tract backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            model: None,
            input_shape: (1, 3, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
            output_shape: (1, 1, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
        }
    }

    /// Parse and optimize a model, pinning the input shape when the graph leaves it open
    fn load_typed(model_path: &Path) -> Result<TypedModel> {
        let typed = onnx()
            .model_for_path(model_path)
            .map_err(|e| FilterError::model(format!("Failed to load ONNX model: {e}")))?
            .into_optimized();

        match typed {
            Ok(model) if Self::concrete_dims(model.input_fact(0).ok()).is_some() => Ok(model),
            _ => {
                log::debug!(
                    "Model input shape is symbolic, pinning to 1x3x{}x{}",
                    DEFAULT_INPUT_SIZE,
                    DEFAULT_INPUT_SIZE
                );
                onnx()
                    .model_for_path(model_path)
                    .map_err(|e| FilterError::model(format!("Failed to load ONNX model: {e}")))?
                    .with_input_fact(
                        0,
                        f32::fact([1, 3, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE]).into(),
                    )
                    .map_err(|e| FilterError::model(format!("Failed to set input shape: {e}")))?
                    .into_optimized()
                    .map_err(|e| FilterError::model(format!("Failed to optimize model: {e}")))
            },
        }
    }

    fn concrete_dims(fact: Option<&TypedFact>) -> Option<Vec<usize>> {
        fact.and_then(|f| f.shape.as_concrete().map(<[usize]>::to_vec))
    }

    fn as_nchw(dims: &[usize]) -> Result<(usize, usize, usize, usize)> {
        TensorValidator::validate_rank(dims, 4).map_err(|e| FilterError::model(e.to_string()))?;
        Ok((
            dims.first().copied().unwrap_or(1),
            dims.get(1).copied().unwrap_or(1),
            dims.get(2).copied().unwrap_or(DEFAULT_INPUT_SIZE),
            dims.get(3).copied().unwrap_or(DEFAULT_INPUT_SIZE),
        ))
    }
}

impl Default for TractBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for TractBackend {
    fn initialize(
        &mut self,
        model_path: &Path,
        candidates: &[ExecutionProvider],
    ) -> Result<LoadReport> {
        let model_load_start = Instant::now();

        for skipped in candidates.iter().filter(|p| p.is_accelerated()) {
            log::debug!("❌ {skipped} execution provider is not supported by Tract, skipping");
        }
        log::info!("🚀 Initializing Tract Backend");
        log::info!("⚡ Execution Provider: CPU (Pure Rust)");

        let typed = Self::load_typed(model_path)?;

        let input_dims = Self::concrete_dims(typed.input_fact(0).ok())
            .ok_or_else(|| FilterError::model("Model input shape is not concrete"))?;
        let input_shape = Self::as_nchw(&input_dims)?;
        let output_shape = match Self::concrete_dims(typed.output_fact(0).ok()) {
            Some(dims) => Self::as_nchw(&dims)?,
            None => (1, 1, input_shape.2, input_shape.3),
        };

        let model = typed
            .into_runnable()
            .map_err(|e| FilterError::model(format!("Failed to create runnable model: {e}")))?;

        self.model = Some(model);
        self.input_shape = input_shape;
        self.output_shape = output_shape;

        let load_time = model_load_start.elapsed();
        log::info!(
            "✅ Tract backend initialized in {:.2}ms",
            load_time.as_secs_f64() * 1000.0
        );

        Ok(LoadReport {
            execution_provider: ExecutionProvider::Cpu,
            load_time,
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| FilterError::inference("Tract model not initialized"))?;

        TensorValidator::validate_input_tensor(input)?;
        log::debug!("🔮 Running Tract inference on {:?}", input.shape());
        let inference_start = Instant::now();

        let input_tensor = Tensor::from(input.clone());
        let outputs = model
            .run(tvec![input_tensor.into()])
            .map_err(|e| FilterError::inference(format!("Tract inference failed: {e}")))?;

        let output_tensor = outputs
            .into_iter()
            .next()
            .ok_or_else(|| FilterError::inference("No output tensor found"))?
            .into_arc_tensor();

        let output_data = output_tensor.to_array_view::<f32>().map_err(|e| {
            FilterError::inference(format!("Failed to convert output tensor: {e}"))
        })?;

        let output_shape = output_data.shape().to_vec();
        TensorValidator::validate_rank(&output_shape, 4)?;
        let output_array = Array4::from_shape_vec(
            (
                output_shape.first().copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.iter().copied().collect(),
        )
        .map_err(|e| FilterError::inference(format!("Failed to reshape output tensor: {e}")))?;

        log::debug!(
            "⚡ Tract inference complete: {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(output_array)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.input_shape
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.output_shape
    }

    fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Tract
    }
}
