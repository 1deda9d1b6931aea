//! Mock backend for testing inference-dependent code without model files

use crate::{
    config::ExecutionProvider,
    error::{FilterError, Result},
    inference::{BackendFactory, BackendType, InferenceBackend, LoadReport},
};
use instant::Duration;
use ndarray::Array4;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// How the mock fills its output tensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockOutput {
    /// Every logit set to this value
    Constant(f32),
    /// Positive logit inside a centered square covering half of each axis, negative outside
    CenterSquare { inside: f32, outside: f32 },
}

/// Mock backend for testing
#[derive(Debug, Clone)]
pub struct MockBackend {
    initialized: bool,
    input_shape: (usize, usize, usize, usize),
    output_shape: (usize, usize, usize, usize),
    output: MockOutput,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    should_fail_init: bool,
    should_fail_inference: bool,
    /// Time spent inside `infer`
    infer_delay: Option<std::time::Duration>,
    /// Raised while a call is inside `infer`
    in_flight: Arc<AtomicBool>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            initialized: false,
            input_shape: (1, 3, 32, 32),
            output_shape: (1, 1, 16, 16),
            output: MockOutput::Constant(20.0),
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
            infer_delay: None,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: MockOutput) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_shapes(
        mut self,
        input: (usize, usize, usize, usize),
        output: (usize, usize, usize, usize),
    ) -> Self {
        self.input_shape = input;
        self.output_shape = output;
        self
    }

    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.should_fail_init = true;
        self
    }

    #[must_use]
    pub fn failing_inference(mut self) -> Self {
        self.should_fail_inference = true;
        self
    }

    #[must_use]
    pub fn with_infer_delay(mut self, delay: std::time::Duration) -> Self {
        self.infer_delay = Some(delay);
        self
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Shared flag raised while `infer` runs
    pub fn in_flight(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.in_flight)
    }

    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }

    fn generate_output(&self) -> Array4<f32> {
        let (_, _, height, width) = self.output_shape;
        match self.output {
            MockOutput::Constant(v) => Array4::from_elem((1, 1, height, width), v),
            MockOutput::CenterSquare { inside, outside } => {
                Array4::from_shape_fn((1, 1, height, width), |(_, _, y, x)| {
                    let in_x = x >= width / 4 && x < width - width / 4;
                    let in_y = y >= height / 4 && y < height - height / 4;
                    if in_x && in_y {
                        inside
                    } else {
                        outside
                    }
                })
            },
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(
        &mut self,
        _model_path: &Path,
        candidates: &[ExecutionProvider],
    ) -> Result<LoadReport> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(FilterError::model("Mock backend initialization failed"));
        }

        self.initialized = true;
        Ok(LoadReport {
            execution_provider: candidates.last().copied().unwrap_or(ExecutionProvider::Cpu),
            load_time: Duration::from_millis(5),
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        self.record_call("infer");

        if !self.initialized {
            return Err(FilterError::inference("Mock backend not initialized"));
        }

        self.in_flight.store(true, Ordering::SeqCst);
        if let Some(delay) = self.infer_delay {
            std::thread::sleep(delay);
        }
        self.in_flight.store(false, Ordering::SeqCst);

        if self.should_fail_inference {
            return Err(FilterError::inference("Mock backend inference failed"));
        }

        let (_, c, h, w) = self.input_shape;
        if input.shape() != [1, c, h, w] {
            return Err(FilterError::inference(format!(
                "Mock expected input [1, {c}, {h}, {w}], got {:?}",
                input.shape()
            )));
        }

        Ok(self.generate_output())
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.input_shape
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.output_shape
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Onnx
    }
}

/// Factory handing out clones of a prepared mock
#[derive(Debug, Clone)]
pub struct MockBackendFactory {
    pub template: MockBackend,
}

impl MockBackendFactory {
    #[must_use]
    pub fn new(template: MockBackend) -> Self {
        Self { template }
    }
}

impl BackendFactory for MockBackendFactory {
    fn create_backend(&self, _backend_type: BackendType) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(self.template.clone()))
    }

    fn available_backends(&self) -> Vec<BackendType> {
        vec![BackendType::Onnx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_lifecycle() {
        let mut backend = MockBackend::new();
        assert!(backend.infer(&Array4::zeros((1, 3, 32, 32))).is_err());

        backend
            .initialize(Path::new("model.onnx"), &ExecutionProvider::default_candidates())
            .unwrap();
        let output = backend.infer(&Array4::zeros((1, 3, 32, 32))).unwrap();
        assert_eq!(output.shape(), &[1, 1, 16, 16]);
        assert_eq!(backend.get_call_history(), vec!["infer", "initialize", "infer"]);
    }

    #[test]
    fn test_center_square_output() {
        let mut backend = MockBackend::new().with_output(MockOutput::CenterSquare {
            inside: 5.0,
            outside: -5.0,
        });
        backend.initialize(Path::new("m.onnx"), &[]).unwrap();
        let output = backend.infer(&Array4::zeros((1, 3, 32, 32))).unwrap();
        assert!((output[[0, 0, 8, 8]] - 5.0).abs() < f32::EPSILON);
        assert!((output[[0, 0, 0, 0]] + 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_failure_flags() {
        let mut backend = MockBackend::new().failing_init();
        assert!(backend.initialize(Path::new("m.onnx"), &[]).is_err());

        let mut backend = MockBackend::new().failing_inference();
        backend.initialize(Path::new("m.onnx"), &[]).unwrap();
        assert!(backend.infer(&Array4::zeros((1, 3, 32, 32))).is_err());
    }
}
