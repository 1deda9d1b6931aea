#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # Background Segmentation Filter
//!
//! Real-time, per-frame background segmentation and compositing for video pipelines. Each frame
//! is converted to a linear RGB work image, run through a person-segmentation model, turned into
//! a soft alpha mask, and composited against either a flat replacement color or a blurred copy of
//! itself before being written back into the host's pixel layout.
//!
//! ## Features
//!
//! - **Verified model loading**: allow-listed directories, traversal rejection, size limits and
//!   optional SHA-256 pinning before any inference engine opens a file
//! - **Multiple Backends**: ONNX Runtime (CUDA / `CoreML` / CPU) and Tract (pure Rust)
//! - **Pixel formats**: I420, NV12 and RGBA, with BT.601 limited-range conversion
//! - **Never blocks the host**: a frame that arrives while the previous one is still being
//!   processed is passed through untouched
//! - **CLI Integration**: optional command-line front end (enable with `cli` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgremove_filter::{BackgroundFilter, FilterSettings, PixelFormat, VideoFilter, VideoFrame};
//!
//! let settings = FilterSettings {
//!     model_path: Some("/usr/share/obs/obs-plugins/obs-background-filter/models/u2net.onnx".into()),
//!     blur_background: true,
//!     replace_background: false,
//!     ..FilterSettings::default()
//! };
//! let filter = BackgroundFilter::create(&settings);
//!
//! let mut frame = VideoFrame::new(PixelFormat::Rgba, 640, 480, vec![0; 640 * 480 * 4]);
//! let outcome = filter.process_frame(&mut frame);
//! println!("{outcome:?}");
//! filter.destroy();
//! ```
//!
//! ### Feature Flags
//!
//! - `tract` (default): Pure Rust backend
//! - `cli` (default): Command-line interface
//! - `onnx`: ONNX Runtime backend with GPU acceleration support
//! - `tracing-json`: JSON log output for the CLI

pub mod backends;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color_space;
pub mod compositor;
pub mod config;
pub mod error;
pub mod filter;
pub mod inference;
pub mod model;
pub mod postprocess;
pub mod security;
#[cfg(feature = "cli")]
pub mod tracing_config;
pub mod types;
pub mod utils;

// Public API exports
pub use backends::*;
pub use color_space::ColorSpaceBridge;
pub use compositor::{CompositeMode, FrameCompositor};
pub use config::{ExecutionProvider, FilterConfig, FilterSettings, ReplacementColor};
pub use error::{ErrorKind, FilterError, Result};
pub use filter::{
    BackgroundFilter, BackgroundFilterBuilder, FilterStats, FrameOutcome, PassThroughReason,
    StatsSnapshot, VideoFilter,
};
pub use inference::{BackendFactory, BackendType, DefaultBackendFactory, InferenceBackend, LoadReport};
pub use model::{ModelHandle, ModelState, SegmentationModel};
pub use postprocess::MaskPostprocessor;
pub use security::{Authorization, ModelIntegrityGate, SecurityPolicy};
pub use types::{PixelFormat, SegmentationMask, VideoFrame, WorkImage};
pub use utils::{
    ColorParser, ConfigValidator, ExecutionProviderManager, ImagePreprocessor, IntegrityChecker,
    NumericValidator, PathValidator, ProviderInfo, TensorValidator,
};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};
