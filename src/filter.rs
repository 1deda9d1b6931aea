//! Per-instance filter context and the host-facing operations
//!
//! A [`BackgroundFilter`] owns everything one filter instance needs: the current validated config
//! snapshot, the segmentation model behind the per-frame critical section, and counters. Hosts
//! drive it through the [`VideoFilter`] operations; no failure inside ever escapes as a panic or
//! error, the frame is simply left untouched.

use crate::color_space::ColorSpaceBridge;
use crate::compositor::FrameCompositor;
use crate::config::{FilterConfig, FilterSettings};
use crate::error::{ErrorKind, Result};
use crate::inference::{BackendFactory, DefaultBackendFactory};
use crate::model::SegmentationModel;
use crate::security::SecurityPolicy;
use crate::types::VideoFrame;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use tracing::{debug, debug_span, info, warn};

/// Host-facing filter lifecycle
pub trait VideoFilter: Sized {
    type Settings;

    /// Build an instance; never fails (a failed model load leaves inference disabled)
    fn create(settings: &Self::Settings) -> Self;

    /// Apply new settings atomically
    fn update(&self, settings: &Self::Settings);

    /// Process one frame in place
    fn process_frame(&self, frame: &mut VideoFrame) -> FrameOutcome;

    /// Tear the instance down, releasing the model
    fn destroy(self);
}

/// Why a frame left the filter unmodified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThroughReason {
    /// No model has been loaded successfully
    ModelNotLoaded,
    /// Another frame for this instance is still being processed
    Busy,
    /// The frame's pixel layout cannot be converted
    UnsupportedFormat,
    /// Conversion, inference, postprocessing or compositing failed for this frame
    InferenceFailed,
    /// Neither background replacement nor blur is enabled
    Disabled,
}

impl std::fmt::Display for PassThroughReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ModelNotLoaded => write!(f, "model not loaded"),
            Self::Busy => write!(f, "busy"),
            Self::UnsupportedFormat => write!(f, "unsupported format"),
            Self::InferenceFailed => write!(f, "inference failed"),
            Self::Disabled => write!(f, "compositing disabled"),
        }
    }
}

/// Result of [`VideoFilter::process_frame`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was composited and written back
    Processed,
    /// The frame is byte-identical to what the host passed in
    PassedThrough(PassThroughReason),
}

impl FrameOutcome {
    #[must_use]
    pub fn is_processed(self) -> bool {
        matches!(self, Self::Processed)
    }
}

/// Per-instance frame counters
#[derive(Debug, Default)]
pub struct FilterStats {
    processed: AtomicU64,
    passed_through: AtomicU64,
    dropped_busy: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`FilterStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub processed: u64,
    /// Every unmodified frame, including busy drops and failures
    pub passed_through: u64,
    pub dropped_busy: u64,
    pub failed: u64,
}

impl FilterStats {
    fn record(&self, outcome: FrameOutcome) {
        match outcome {
            FrameOutcome::Processed => {
                self.processed.fetch_add(1, Ordering::Relaxed);
            },
            FrameOutcome::PassedThrough(reason) => {
                self.passed_through.fetch_add(1, Ordering::Relaxed);
                match reason {
                    PassThroughReason::Busy => {
                        self.dropped_busy.fetch_add(1, Ordering::Relaxed);
                    },
                    PassThroughReason::InferenceFailed => {
                        self.failed.fetch_add(1, Ordering::Relaxed);
                    },
                    _ => {},
                }
            },
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            passed_through: self.passed_through.load(Ordering::Relaxed),
            dropped_busy: self.dropped_busy.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Builder for [`BackgroundFilter`] with a custom policy or backend factory
pub struct BackgroundFilterBuilder {
    settings: FilterSettings,
    policy: Option<SecurityPolicy>,
    factory: Box<dyn BackendFactory>,
}

impl BackgroundFilterBuilder {
    #[must_use]
    pub fn new(settings: FilterSettings) -> Self {
        Self {
            settings,
            policy: None,
            factory: Box::new(DefaultBackendFactory),
        }
    }

    /// Override the model allow-list and limits (default: the plugin allow-list)
    #[must_use]
    pub fn policy(mut self, policy: SecurityPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub fn backend_factory(mut self, factory: Box<dyn BackendFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Validate settings and load the configured model
    #[must_use]
    pub fn build(self) -> BackgroundFilter {
        let config = FilterConfig::from_settings(&self.settings);
        let mut model = SegmentationModel::with_factory(self.factory)
            .with_execution_providers(self.settings.execution_providers.clone());

        match &self.settings.model_path {
            Some(path) => {
                let policy = self
                    .policy
                    .unwrap_or_else(SecurityPolicy::plugin_default)
                    .with_expected_sha256(self.settings.model_sha256.clone());
                if !model.load_model(path, &policy) {
                    warn!("Background segmentation disabled: model failed to load");
                }
            },
            None => warn!("No model configured, background segmentation disabled"),
        }

        info!(
            threshold = config.threshold(),
            replace = config.replace_background(),
            blur = config.blur_background(),
            model_loaded = model.is_loaded(),
            "Background filter created"
        );

        BackgroundFilter {
            config: RwLock::new(Arc::new(config)),
            model: Mutex::new(model),
            stats: FilterStats::default(),
        }
    }
}

/// One background-segmentation filter instance
pub struct BackgroundFilter {
    config: RwLock<Arc<FilterConfig>>,
    model: Mutex<SegmentationModel>,
    stats: FilterStats,
}

impl BackgroundFilter {
    #[must_use]
    pub fn builder(settings: FilterSettings) -> BackgroundFilterBuilder {
        BackgroundFilterBuilder::new(settings)
    }

    /// Current config snapshot
    #[must_use]
    pub fn config(&self) -> Arc<FilterConfig> {
        let guard = self
            .config
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Whether a model is loaded; waits for an in-flight frame to finish
    #[must_use]
    pub fn is_model_loaded(&self) -> bool {
        self.lock_model().is_loaded()
    }

    /// Release the current model and gate/load another one
    ///
    /// Waits for an in-flight frame; frames arriving meanwhile are dropped as busy.
    pub fn reload(&self, path: &Path, policy: &SecurityPolicy) -> bool {
        self.lock_model().load_model(path, policy)
    }

    fn lock_model(&self) -> std::sync::MutexGuard<'_, SegmentationModel> {
        self.model
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn run_pipeline(
        model: &mut SegmentationModel,
        config: &FilterConfig,
        frame: &mut VideoFrame,
    ) -> Result<()> {
        let work = ColorSpaceBridge::to_work_image(frame)?;
        let mask = model.infer_smoothed(&work, config.threshold(), config.smoothing_kernel_size())?;
        let composited = FrameCompositor::composite(&work, &mask, config)?;
        ColorSpaceBridge::write_back(&composited, frame)
    }

    fn process_locked(
        model: &mut SegmentationModel,
        config: &FilterConfig,
        frame: &mut VideoFrame,
    ) -> FrameOutcome {
        if !model.is_loaded() {
            return FrameOutcome::PassedThrough(PassThroughReason::ModelNotLoaded);
        }
        if !frame.format.is_supported() {
            return FrameOutcome::PassedThrough(PassThroughReason::UnsupportedFormat);
        }
        if !config.compositing_enabled() {
            return FrameOutcome::PassedThrough(PassThroughReason::Disabled);
        }

        match Self::run_pipeline(model, config, frame) {
            Ok(()) => FrameOutcome::Processed,
            Err(e) if e.kind() == ErrorKind::UnsupportedFormat => {
                FrameOutcome::PassedThrough(PassThroughReason::UnsupportedFormat)
            },
            Err(e) => {
                warn!("Frame passed through after processing failure: {}", e);
                FrameOutcome::PassedThrough(PassThroughReason::InferenceFailed)
            },
        }
    }
}

impl VideoFilter for BackgroundFilter {
    type Settings = FilterSettings;

    fn create(settings: &FilterSettings) -> Self {
        BackgroundFilterBuilder::new(settings.clone()).build()
    }

    fn update(&self, settings: &FilterSettings) {
        let config = Arc::new(FilterConfig::from_settings(settings));
        debug!(?config, "Applying filter settings");
        let mut guard = self
            .config
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = config;
    }

    fn process_frame(&self, frame: &mut VideoFrame) -> FrameOutcome {
        let _span = debug_span!(
            "process_frame",
            format = %frame.format,
            width = frame.width,
            height = frame.height
        )
        .entered();

        let config = self.config();

        let outcome = match self.model.try_lock() {
            Ok(mut model) => Self::process_locked(&mut model, &config, frame),
            Err(TryLockError::Poisoned(poisoned)) => {
                Self::process_locked(&mut poisoned.into_inner(), &config, frame)
            },
            Err(TryLockError::WouldBlock) => {
                debug!("Previous frame still processing, dropping effect for this frame");
                FrameOutcome::PassedThrough(PassThroughReason::Busy)
            },
        };

        self.stats.record(outcome);
        outcome
    }

    fn destroy(self) {
        drop(self);
    }
}

impl Drop for BackgroundFilter {
    fn drop(&mut self) {
        let stats = self.stats.snapshot();
        self.lock_model().unload();
        info!(
            processed = stats.processed,
            passed_through = stats.passed_through,
            "Background filter destroyed"
        );
    }
}

impl std::fmt::Debug for BackgroundFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundFilter")
            .field("config", &self.config())
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
