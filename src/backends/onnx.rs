//! ONNX Runtime backend
//!
//! Walks the execution-provider candidate list in order, binding the session to the first
//! provider that is available and registers cleanly. CPU is always the terminal candidate.

use crate::config::ExecutionProvider;
use crate::error::{FilterError, Result};
use crate::inference::{BackendType, InferenceBackend, LoadReport};
use crate::utils::validation::TensorValidator;
use ndarray::Array4;
use ort::execution_providers::{
    CUDAExecutionProvider, CoreMLExecutionProvider, ExecutionProvider as OrtExecutionProvider,
};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::{self, value::Value};
use std::path::Path;

/// Spatial size assumed when the graph leaves the input dimensions symbolic
pub const DEFAULT_INPUT_SIZE: usize = 320;

/// ONNX Runtime backend for segmentation models
#[derive(Debug)]
pub struct OnnxBackend {
    session: Option<Session>,
    input_shape: (usize, usize, usize, usize),
    output_shape: (usize, usize, usize, usize),
    execution_provider: Option<ExecutionProvider>,
}

impl OnnxBackend {
    /// List ONNX Runtime execution providers with availability status and descriptions
    ///
    /// ```rust,no_run
    /// use bgremove_filter::backends::OnnxBackend;
    ///
    /// for (provider, available, description) in OnnxBackend::list_providers() {
    ///     println!("{}: {} - {}", provider, if available { "✅" } else { "❌" }, description);
    /// }
    /// ```
    #[must_use]
    pub fn list_providers() -> Vec<(ExecutionProvider, bool, String)> {
        log::debug!("🔍 System Hardware Analysis:");
        log::debug!("  - Platform: {os}", os = std::env::consts::OS);
        log::debug!("  - Architecture: {arch}", arch = std::env::consts::ARCH);

        ExecutionProvider::default_candidates()
            .into_iter()
            .map(|provider| {
                let available = Self::is_provider_available(provider);
                let description = match provider {
                    ExecutionProvider::Cuda => {
                        "NVIDIA GPU acceleration (requires CUDA toolkit and compatible GPU)"
                    },
                    ExecutionProvider::CoreMl => "Apple Silicon GPU acceleration (macOS only)",
                    ExecutionProvider::Cpu => "Always available, uses CPU for inference",
                };
                (provider, available, description.to_string())
            })
            .collect()
    }

    /// Whether ONNX Runtime reports a provider as usable on this machine
    #[must_use]
    pub fn is_provider_available(provider: ExecutionProvider) -> bool {
        match provider {
            ExecutionProvider::Cuda => {
                OrtExecutionProvider::is_available(&CUDAExecutionProvider::default())
                    .unwrap_or(false)
            },
            ExecutionProvider::CoreMl => {
                OrtExecutionProvider::is_available(&CoreMLExecutionProvider::default())
                    .unwrap_or(false)
            },
            ExecutionProvider::Cpu => true,
        }
    }

    #[must_use]
    pub fn new() -> Self {
        Self {
            session: None,
            input_shape: (1, 3, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
            output_shape: (1, 1, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
            execution_provider: None,
        }
    }

    /// Execution provider the current session is bound to
    #[must_use]
    pub fn execution_provider(&self) -> Option<ExecutionProvider> {
        self.execution_provider
    }

    /// Build a session bound to one provider
    fn build_session(model_path: &Path, provider: ExecutionProvider) -> Result<Session> {
        let intra_threads = std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(4);

        let mut session_builder = Session::builder()
            .map_err(|e| FilterError::model(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(|e| FilterError::model(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(intra_threads)
            .map_err(|e| FilterError::model(format!("Failed to set intra threads: {e}")))?;

        session_builder = match provider {
            ExecutionProvider::Cuda => session_builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .build()
                    .error_on_failure()])
                .map_err(|e| {
                    FilterError::model(format!("Failed to set CUDA execution provider: {e}"))
                })?,
            ExecutionProvider::CoreMl => session_builder
                .with_execution_providers([CoreMLExecutionProvider::default()
                    .with_subgraphs(true)
                    .build()
                    .error_on_failure()])
                .map_err(|e| {
                    FilterError::model(format!("Failed to set CoreML execution provider: {e}"))
                })?,
            ExecutionProvider::Cpu => session_builder,
        };

        session_builder.commit_from_file(model_path).map_err(|e| {
            FilterError::model(format!(
                "Failed to create session from {}: {e}",
                model_path.display()
            ))
        })
    }

    /// Read `(N, C, H, W)` from a graph-declared shape, substituting `fallback` for symbolic dims
    fn concrete_shape(
        dims: Option<&[i64]>,
        fallback: (usize, usize, usize, usize),
    ) -> Result<(usize, usize, usize, usize)> {
        let Some(dims) = dims else {
            return Ok(fallback);
        };
        TensorValidator::validate_rank(
            &dims.iter().map(|&d| d.max(0) as usize).collect::<Vec<_>>(),
            4,
        )
        .map_err(|e| FilterError::model(e.to_string()))?;

        let pick = |idx: usize, default: usize| {
            dims.get(idx)
                .copied()
                .filter(|&d| d > 0)
                .map_or(default, |d| d as usize)
        };
        Ok((
            pick(0, fallback.0),
            pick(1, fallback.1),
            pick(2, fallback.2),
            pick(3, fallback.3),
        ))
    }
}

impl Default for OnnxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for OnnxBackend {
    fn initialize(
        &mut self,
        model_path: &Path,
        candidates: &[ExecutionProvider],
    ) -> Result<LoadReport> {
        let model_load_start = instant::Instant::now();

        let mut ordered: Vec<ExecutionProvider> = candidates.to_vec();
        if !ordered.contains(&ExecutionProvider::Cpu) {
            ordered.push(ExecutionProvider::Cpu);
        }

        let mut last_error = None;
        let mut bound = None;
        for provider in ordered {
            log::debug!("🔍 Trying execution provider: {provider}");
            if !Self::is_provider_available(provider) {
                log::debug!("❌ {provider} execution provider is not available");
                continue;
            }
            match Self::build_session(model_path, provider) {
                Ok(session) => {
                    bound = Some((session, provider));
                    break;
                },
                Err(e) => {
                    log::warn!("⚠️ {provider} execution provider failed to initialize: {e}");
                    last_error = Some(e);
                },
            }
        }

        let (session, provider) = bound.ok_or_else(|| {
            last_error.unwrap_or_else(|| {
                FilterError::model("No execution provider could initialize the model")
            })
        })?;

        let input_dims = session
            .inputs
            .first()
            .ok_or_else(|| FilterError::model("Model declares no inputs"))?
            .input_type
            .tensor_shape()
            .map(|s| s.to_vec());
        let input_shape = Self::concrete_shape(
            input_dims.as_deref(),
            (1, 3, DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE),
        )?;

        let output_dims = session
            .outputs
            .first()
            .ok_or_else(|| FilterError::model("Model declares no outputs"))?
            .output_type
            .tensor_shape()
            .map(|s| s.to_vec());
        let output_shape =
            Self::concrete_shape(output_dims.as_deref(), (1, 1, input_shape.2, input_shape.3))?;

        if provider.is_accelerated() {
            log::info!("🚀 {provider} execution provider is available and will be used");
        } else {
            log::warn!("⚠️ No hardware acceleration available, falling back to CPU");
        }
        log::debug!(
            "ONNX session ready: input {:?}, output {:?}",
            input_shape,
            output_shape
        );

        self.session = Some(session);
        self.input_shape = input_shape;
        self.output_shape = output_shape;
        self.execution_provider = Some(provider);

        let load_time = model_load_start.elapsed();
        log::info!(
            "📊 Model loading complete: {:.0}ms",
            load_time.as_secs_f64() * 1000.0
        );

        Ok(LoadReport {
            execution_provider: provider,
            load_time,
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| FilterError::inference("ONNX session not initialized"))?;
        let provider = self
            .execution_provider
            .map_or_else(|| "unknown".to_string(), |p| p.to_string());

        TensorValidator::validate_input_tensor(input)?;
        let inference_start = instant::Instant::now();

        let input_value = Value::from_array(input.clone()).map_err(|e| {
            FilterError::inference(format!("Failed to convert input tensor: {e}"))
        })?;

        let outputs = session.run(ort::inputs![input_value]).map_err(|e| {
            FilterError::inference_error_with_provider(&provider, "ONNX inference", &e.to_string())
        })?;

        // Positional access: the first output carries the foreground logits
        let keys: Vec<_> = outputs.keys().collect();
        let first_key = keys
            .first()
            .ok_or_else(|| FilterError::inference("No output tensors found"))?;
        let output_tensor = outputs
            .get(first_key)
            .ok_or_else(|| FilterError::inference("First output tensor not found"))?
            .try_extract_array::<f32>()
            .map_err(|e| FilterError::inference(format!("Failed to extract output tensor: {e}")))?;

        let output_shape = output_tensor.shape().to_vec();
        TensorValidator::validate_rank(&output_shape, 4)?;
        let output_data = output_tensor.view().to_owned();
        let result = Array4::from_shape_vec(
            (
                output_shape.first().copied().unwrap_or(1),
                output_shape.get(1).copied().unwrap_or(1),
                output_shape.get(2).copied().unwrap_or(1),
                output_shape.get(3).copied().unwrap_or(1),
            ),
            output_data.into_raw_vec_and_offset().0,
        )
        .map_err(|e| FilterError::inference(format!("Failed to reshape output tensor: {e}")))?;

        log::debug!(
            "⚡ Inference complete: {:.2}ms",
            inference_start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(result)
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.input_shape
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.output_shape
    }

    fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Onnx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_backend_is_uninitialized() {
        let mut backend = OnnxBackend::new();
        assert!(!backend.is_initialized());
        assert_eq!(backend.backend_type(), BackendType::Onnx);
        assert_eq!(backend.input_shape(), (1, 3, 320, 320));
        assert!(backend.infer(&Array4::zeros((1, 3, 320, 320))).is_err());
    }

    #[test]
    fn test_concrete_shape_substitutes_symbolic_dims() {
        let shape =
            OnnxBackend::concrete_shape(Some(&[-1, 3, -1, -1]), (1, 3, 320, 320)).unwrap();
        assert_eq!(shape, (1, 3, 320, 320));

        let shape = OnnxBackend::concrete_shape(Some(&[1, 1, 160, 96]), (1, 1, 320, 320)).unwrap();
        assert_eq!(shape, (1, 1, 160, 96));

        assert!(OnnxBackend::concrete_shape(Some(&[1, 320, 320]), (1, 1, 320, 320)).is_err());
        assert_eq!(
            OnnxBackend::concrete_shape(None, (1, 1, 64, 64)).unwrap(),
            (1, 1, 64, 64)
        );
    }

    #[test]
    fn test_missing_model_file_fails() {
        let mut backend = OnnxBackend::new();
        let result = backend.initialize(
            Path::new("/nonexistent/model.onnx"),
            &[ExecutionProvider::Cpu],
        );
        assert!(result.is_err());
        assert!(!backend.is_initialized());
    }

    #[test]
    fn test_list_providers_includes_cpu() {
        let providers = OnnxBackend::list_providers();
        assert!(providers
            .iter()
            .any(|(p, available, _)| *p == ExecutionProvider::Cpu && *available));
    }
}
