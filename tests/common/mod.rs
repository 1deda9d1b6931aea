//! Shared fixtures for integration tests: a scripted inference backend and a model allow-list
//! rooted in a temp directory

#![allow(dead_code)]

use bgremove_filter::{
    BackendFactory, BackendType, ExecutionProvider, FilterError, InferenceBackend, LoadReport,
    PassthroughBackend, Result, SecurityPolicy,
};
use ndarray::Array4;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MODEL_BYTES: &[u8] = b"scripted segmentation model";

/// Backend whose output is a fixed function of the output coordinates
#[derive(Clone)]
pub struct ScriptedBackend {
    initialized: bool,
    input: (usize, usize, usize, usize),
    output: (usize, usize, usize, usize),
    logits: fn(usize, usize, usize, usize) -> f32,
}

impl ScriptedBackend {
    pub fn new(logits: fn(usize, usize, usize, usize) -> f32) -> Self {
        Self {
            initialized: false,
            input: (1, 3, 24, 24),
            output: (1, 1, 12, 12),
            logits,
        }
    }

    pub fn with_output_channels(mut self, channels: usize) -> Self {
        self.output.1 = channels;
        self
    }
}

/// Everything is foreground
pub fn all_foreground(_: usize, _: usize, _: usize, _: usize) -> f32 {
    20.0
}

/// Everything is background
pub fn all_background(_: usize, _: usize, _: usize, _: usize) -> f32 {
    -20.0
}

/// Left half foreground, right half background
pub fn left_half(x: usize, _: usize, width: usize, _: usize) -> f32 {
    if x < width / 2 {
        20.0
    } else {
        -20.0
    }
}

impl InferenceBackend for ScriptedBackend {
    fn initialize(&mut self, _model_path: &Path, candidates: &[ExecutionProvider]) -> Result<LoadReport> {
        self.initialized = true;
        Ok(LoadReport {
            execution_provider: candidates.last().copied().unwrap_or(ExecutionProvider::Cpu),
            load_time: instant::Duration::from_millis(1),
        })
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if !self.initialized {
            return Err(FilterError::inference("not initialized"));
        }
        let (_, c, h, w) = self.input;
        if input.shape() != [1, c, h, w] {
            return Err(FilterError::inference("unexpected input shape"));
        }
        let (_, oc, oh, ow) = self.output;
        let logits = self.logits;
        Ok(Array4::from_shape_fn((1, oc, oh, ow), |(_, _, y, x)| logits(x, y, ow, oh)))
    }

    fn input_shape(&self) -> (usize, usize, usize, usize) {
        self.input
    }

    fn output_shape(&self) -> (usize, usize, usize, usize) {
        self.output
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Tract
    }
}

pub struct ScriptedFactory(pub ScriptedBackend);

impl BackendFactory for ScriptedFactory {
    fn create_backend(&self, _backend_type: BackendType) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(self.0.clone()))
    }

    fn available_backends(&self) -> Vec<BackendType> {
        vec![BackendType::Tract]
    }
}

/// Always hands out the inert engine, as a build without any engine feature would
pub struct PassthroughFactory;

impl BackendFactory for PassthroughFactory {
    fn create_backend(&self, _backend_type: BackendType) -> Result<Box<dyn InferenceBackend>> {
        Ok(Box::new(PassthroughBackend::new()))
    }

    fn available_backends(&self) -> Vec<BackendType> {
        vec![BackendType::Passthrough]
    }
}

/// Temp directory with an allow-listed `models/` dir holding one model file
pub struct ModelFixture {
    pub dir: TempDir,
    pub model_path: PathBuf,
    pub policy: SecurityPolicy,
}

impl ModelFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir");
        let models = dir.path().join("models");
        fs::create_dir(&models).expect("models dir");
        let model_path = models.join("segmenter.onnx");
        fs::write(&model_path, MODEL_BYTES).expect("model file");
        Self {
            policy: SecurityPolicy::new(vec![models]),
            model_path,
            dir,
        }
    }

    pub fn models_dir(&self) -> PathBuf {
        self.dir.path().join("models")
    }
}
