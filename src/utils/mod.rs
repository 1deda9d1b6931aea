//! Shared utilities: validation, preprocessing, blur kernels, color parsing and provider listing

pub mod blur;
pub mod color;
pub mod preprocessing;
pub mod providers;
pub mod validation;

pub use color::ColorParser;
pub use preprocessing::{ImagePreprocessor, PreprocessingConfig};
pub use providers::{ExecutionProviderManager, ProviderInfo};
pub use validation::{
    ConfigValidator, IntegrityChecker, NumericValidator, PathValidator, TensorValidator,
};
