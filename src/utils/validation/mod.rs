//! Consolidated validation utilities
//!
//! Range checks for tunables, path and content checks for model artifacts, and tensor shape
//! checks at the inference boundary.

pub mod config;
pub mod integrity;
pub mod numeric;
pub mod path;
pub mod tensor;

pub use config::ConfigValidator;
pub use integrity::IntegrityChecker;
pub use numeric::NumericValidator;
pub use path::PathValidator;
pub use tensor::TensorValidator;
