//! Background filter CLI
//!
//! Runs the frame filter over a still image, converting it into the requested host pixel layout
//! first, so the whole per-frame path (bridge, model, mask, compositor) can be exercised offline.

use super::config::CliConfigBuilder;
use crate::{
    color_space::ColorSpaceBridge,
    filter::{BackgroundFilter, FrameOutcome, VideoFilter},
    tracing_config::init_cli_tracing,
    types::{PixelFormat, VideoFrame, WorkImage},
    utils::ExecutionProviderManager,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Background segmentation filter CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "bgremove-filter")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Input image file
    #[arg(value_name = "INPUT", required_unless_present = "show_providers")]
    pub input: Option<PathBuf>,

    /// Output image file (PNG or JPEG by extension)
    #[arg(value_name = "OUTPUT", required_unless_present = "show_providers")]
    pub output: Option<PathBuf>,

    /// Segmentation model (.onnx); must live in an allowed directory
    #[arg(short, long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Expected SHA-256 of the model file (hex)
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Extra directory models may be loaded from (repeatable)
    #[arg(long, value_name = "DIR")]
    pub allow_dir: Vec<PathBuf>,

    /// JSON settings file; individual flags override its values
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Mask threshold in [0, 1]
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Blur the background instead of (or under) replacing it
    #[arg(long)]
    pub blur: bool,

    /// Background blur radius in [1, 50]
    #[arg(long)]
    pub blur_amount: Option<i64>,

    /// Disable flat-color background replacement
    #[arg(long)]
    pub no_replace: bool,

    /// Replacement color as hex (#RRGGBB or #RGB)
    #[arg(short, long)]
    pub color: Option<String>,

    /// Mask edge smoothing radius in [1, 10]
    #[arg(long)]
    pub edge_smoothing: Option<i64>,

    /// Disable mask edge smoothing
    #[arg(long)]
    pub no_smooth_edges: bool,

    /// Ordered execution providers, e.g. "cuda,coreml,cpu"
    #[arg(short = 'e', long, value_name = "LIST")]
    pub providers: Option<String>,

    /// Host pixel layout to simulate (i420, nv12, rgba)
    #[arg(short, long, default_value = "rgba")]
    pub pixel_format: PixelFormat,

    /// Number of times to run the frame through the filter (for timing)
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Show execution provider diagnostics and exit
    #[arg(long)]
    pub show_providers: bool,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    if cli.show_providers {
        show_provider_diagnostics();
        return Ok(());
    }

    let (Some(input), Some(output)) = (&cli.input, &cli.output) else {
        bail!("Both INPUT and OUTPUT are required");
    };

    let settings = CliConfigBuilder::settings_from_cli(cli)?;
    CliConfigBuilder::validate(&settings)?;
    if settings.model_path.is_none() {
        bail!("No model given. Use --model or set model_path in the settings file");
    }
    let policy = CliConfigBuilder::policy_from_cli(cli);

    let filter = BackgroundFilter::builder(settings).policy(policy).build();
    if !filter.is_model_loaded() {
        bail!("Model could not be loaded; rerun with -v for the rejection reason");
    }

    let image = image::open(input)
        .with_context(|| format!("Failed to open input image {}", input.display()))?;
    let template = frame_from_image(&image, cli.pixel_format)?;
    info!(
        input = %input.display(),
        format = %template.format,
        width = template.width,
        height = template.height,
        "📥 Loaded input"
    );

    let start = Instant::now();
    let mut frame = template.clone();
    let mut last = FrameOutcome::Processed;
    for index in 0..cli.frames.max(1) {
        frame.clone_from(&template);
        last = filter.process_frame(&mut frame);
        debug!(index, outcome = ?last, "Frame done");
    }
    let elapsed = start.elapsed();

    if let FrameOutcome::PassedThrough(reason) = last {
        warn!("⚠️  Frame passed through unmodified: {}", reason);
    }

    save_frame(&frame, output)?;

    let stats = filter.stats();
    info!(
        processed = stats.processed,
        passed_through = stats.passed_through,
        avg_ms = elapsed.as_secs_f64() * 1000.0 / f64::from(cli.frames.max(1)),
        "✅ Wrote {}",
        output.display()
    );
    filter.destroy();
    Ok(())
}

/// Lay a decoded image out the way a host would hand it over
fn frame_from_image(image: &DynamicImage, format: PixelFormat) -> Result<VideoFrame> {
    let (width, height) = (image.width(), image.height());
    match format {
        PixelFormat::Rgba => Ok(VideoFrame::new(
            PixelFormat::Rgba,
            width,
            height,
            image.to_rgba8().into_raw(),
        )),
        PixelFormat::I420 | PixelFormat::Nv12 => {
            let work: WorkImage = image.to_rgb32f();
            let len = VideoFrame::layout_len(format, width, height)
                .with_context(|| format!("{}x{} is too large for {}", width, height, format))?;
            let mut frame = VideoFrame::new(format, width, height, vec![0; len]);
            ColorSpaceBridge::write_back(&work, &mut frame)?;
            Ok(frame)
        },
        other => bail!("Pixel format {} cannot be simulated", other),
    }
}

fn save_frame(frame: &VideoFrame, output: &Path) -> Result<()> {
    if frame.format == PixelFormat::Rgba {
        let image = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .context("Frame buffer does not match its dimensions")?;
        image
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        return Ok(());
    }

    let work = ColorSpaceBridge::to_work_image(frame)?;
    DynamicImage::ImageRgb32F(work)
        .to_rgb8()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))
}

fn show_provider_diagnostics() {
    println!("🔍 Backend and Execution Provider Diagnostics");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cpu_count = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    println!("💻 System: {cpu_count} CPU cores detected");

    println!("\n🚀 Execution Providers:");
    for provider_info in ExecutionProviderManager::list_all_providers() {
        let status = if provider_info.available {
            "✅ Available"
        } else {
            "❌ Not Available"
        };
        println!(
            "  • {}: {} - {}",
            provider_info.name, status, provider_info.description
        );
    }

    println!("\n💡 Usage Examples:");
    println!("  --providers cuda,cpu     # Try CUDA first, fall back to CPU");
    println!("  --providers coreml,cpu   # Apple Neural Engine / GPU first");
    println!("  --providers cpu          # CPU only");

    println!("\n📋 Notes:");
    println!("  • CPU is always tried last when an accelerator fails to initialize");
    println!("  • Models load only from allow-listed directories (extend with --allow-dir)");
}
