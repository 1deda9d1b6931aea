//! Configuration types for the background filter
//!
//! [`FilterSettings`] carries raw host-side values exactly as they arrive from the host (or from a
//! JSON settings file). [`FilterConfig`] is the validated, immutable snapshot the pipeline reads;
//! it can only be produced through [`FilterConfig::from_settings`], so every field is always inside
//! its declared range.

use crate::error::{FilterError, Result};
use crate::utils::validation::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default segmentation threshold
pub const DEFAULT_THRESHOLD: f32 = 0.5;
/// Default background blur strength
pub const DEFAULT_BLUR_AMOUNT: u32 = 15;
/// Default edge smoothing strength
pub const DEFAULT_EDGE_SMOOTHING: u32 = 3;
/// Default replacement color (pure green)
pub const DEFAULT_REPLACEMENT_COLOR: u32 = 0xFF00_FF00;

/// Execution provider candidates for the inference engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// NVIDIA CUDA GPU acceleration
    Cuda,
    /// Apple Silicon acceleration (Neural Engine / GPU)
    CoreMl,
    /// Portable CPU execution (always available)
    Cpu,
}

impl ExecutionProvider {
    /// Ordered candidate list tried at load time: accelerated paths first, CPU last
    #[must_use]
    pub fn default_candidates() -> Vec<Self> {
        vec![Self::Cuda, Self::CoreMl, Self::Cpu]
    }

    /// Whether this provider is a hardware-accelerated path
    #[must_use]
    pub fn is_accelerated(self) -> bool {
        !matches!(self, Self::Cpu)
    }
}

impl std::fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::CoreMl => write!(f, "coreml"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

impl FromStr for ExecutionProvider {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cuda" => Ok(Self::Cuda),
            "coreml" => Ok(Self::CoreMl),
            "cpu" => Ok(Self::Cpu),
            other => Err(FilterError::config_validation(format!(
                "Unknown execution provider: {}. Supported: cuda, coreml, cpu",
                other
            ))),
        }
    }
}

/// Solid background color, packed as `0x??RRGGBB` (the top byte is ignored)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplacementColor(pub u32);

impl ReplacementColor {
    #[must_use]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Unpack into `[r, g, b]`
    #[must_use]
    pub const fn rgb(self) -> [u8; 3] {
        [
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        ]
    }

    /// Color in the work-image unit range
    #[must_use]
    pub fn to_unit(self) -> [f32; 3] {
        let [r, g, b] = self.rgb();
        [
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        ]
    }
}

impl Default for ReplacementColor {
    fn default() -> Self {
        Self(DEFAULT_REPLACEMENT_COLOR)
    }
}

/// Raw, unvalidated filter settings as delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct FilterSettings {
    pub threshold: f32,
    pub blur_background: bool,
    pub blur_amount: i64,
    pub replace_background: bool,
    pub replacement_color: ReplacementColor,
    pub smooth_edges: bool,
    pub edge_smoothing: i64,
    /// Model artifact to load at creation (`None` leaves inference disabled)
    pub model_path: Option<PathBuf>,
    /// Known-good SHA-256 of the model artifact, hex encoded
    pub model_sha256: Option<String>,
    /// Execution providers to try, in order
    pub execution_providers: Vec<ExecutionProvider>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            blur_background: false,
            blur_amount: i64::from(DEFAULT_BLUR_AMOUNT),
            replace_background: true,
            replacement_color: ReplacementColor::default(),
            smooth_edges: true,
            edge_smoothing: i64::from(DEFAULT_EDGE_SMOOTHING),
            model_path: None,
            model_sha256: None,
            execution_providers: ExecutionProvider::default_candidates(),
        }
    }
}

impl FilterSettings {
    /// Parse settings from a JSON document; missing keys take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            FilterError::config_validation(format!("Failed to parse filter settings: {}", e))
        })
    }

    /// Read and parse a JSON settings file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FilterError::file_io_error("read settings file", path, &e))?;
        Self::from_json_str(&contents)
    }
}

/// Validated, immutable tunables snapshot
///
/// Ranged fields are either all taken from the settings or all replaced by the safe defaults;
/// a snapshot is never partially validated.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct FilterConfig {
    threshold: f32,
    blur_background: bool,
    blur_amount: u32,
    replace_background: bool,
    replacement_color: ReplacementColor,
    smooth_edges: bool,
    edge_smoothing: u32,
}

impl FilterConfig {
    /// Build a snapshot from raw settings, substituting safe defaults on validation failure
    #[must_use]
    pub fn from_settings(settings: &FilterSettings) -> Self {
        let (threshold, blur_amount, edge_smoothing) = if ConfigValidator::validate(
            settings.threshold,
            settings.blur_amount,
            settings.edge_smoothing,
        ) {
            // In range, so the narrowing casts are lossless
            (
                settings.threshold,
                settings.blur_amount as u32,
                settings.edge_smoothing as u32,
            )
        } else {
            tracing::error!("Invalid configuration values detected, using safe defaults instead");
            ConfigValidator::safe_defaults()
        };

        Self {
            threshold,
            blur_background: settings.blur_background,
            blur_amount,
            replace_background: settings.replace_background,
            replacement_color: settings.replacement_color,
            smooth_edges: settings.smooth_edges,
            edge_smoothing,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    #[must_use]
    pub fn blur_background(&self) -> bool {
        self.blur_background
    }

    #[must_use]
    pub fn blur_amount(&self) -> u32 {
        self.blur_amount
    }

    #[must_use]
    pub fn replace_background(&self) -> bool {
        self.replace_background
    }

    #[must_use]
    pub fn replacement_color(&self) -> ReplacementColor {
        self.replacement_color
    }

    #[must_use]
    pub fn smooth_edges(&self) -> bool {
        self.smooth_edges
    }

    #[must_use]
    pub fn edge_smoothing(&self) -> u32 {
        self.edge_smoothing
    }

    /// Background blur kernel size, `2 * blur_amount + 1`
    #[must_use]
    pub fn blur_kernel_size(&self) -> u32 {
        crate::utils::blur::kernel_size_for(self.blur_amount)
    }

    /// Edge smoothing kernel size, or `None` when smoothing is off
    #[must_use]
    pub fn smoothing_kernel_size(&self) -> Option<u32> {
        self.smooth_edges
            .then(|| crate::utils::blur::kernel_size_for(self.edge_smoothing))
    }

    /// Whether any compositing branch is active
    #[must_use]
    pub fn compositing_enabled(&self) -> bool {
        self.replace_background || self.blur_background
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::from_settings(&FilterSettings::default())
    }
}
