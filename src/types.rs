//! Frame, work image and mask types shared across the pipeline

use crate::error::{FilterError, Result};
use image::{ImageBuffer, Luma, Rgb32FImage};

/// Largest frame edge accepted by [`VideoFrame::validate`]
pub const MAX_FRAME_DIMENSION: u32 = 16384;

/// Internal 3-channel RGB work image, nominal range [0,1]
pub type WorkImage = Rgb32FImage;

/// Single-channel float map used for raw model output and masks
pub type MaskBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Native pixel layouts a host can hand to the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 4:2:0: Y plane, then U plane, then V plane
    I420,
    /// Semi-planar 4:2:0: Y plane, then interleaved UV plane
    Nv12,
    /// Packed 8-bit RGBA
    Rgba,
    /// Packed 8-bit BGRA
    Bgra,
    /// Packed 4:2:2 YUYV
    Yuy2,
    /// Any tag the filter does not recognise
    Unknown(u32),
}

impl PixelFormat {
    /// Whether the color bridge can convert this layout
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, Self::I420 | Self::Nv12 | Self::Rgba)
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::I420 => write!(f, "I420"),
            Self::Nv12 => write!(f, "NV12"),
            Self::Rgba => write!(f, "RGBA"),
            Self::Bgra => write!(f, "BGRA"),
            Self::Yuy2 => write!(f, "YUY2"),
            Self::Unknown(tag) => write!(f, "unknown({})", tag),
        }
    }
}

impl std::str::FromStr for PixelFormat {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "i420" => Ok(Self::I420),
            "nv12" => Ok(Self::Nv12),
            "rgba" => Ok(Self::Rgba),
            "bgra" => Ok(Self::Bgra),
            "yuy2" => Ok(Self::Yuy2),
            other => Err(FilterError::unsupported_format(other.to_string())),
        }
    }
}

/// Chroma plane dimensions for 4:2:0 layouts
#[must_use]
pub fn chroma_dimensions(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(2), height.div_ceil(2))
}

/// A raw host video frame in one contiguous buffer
///
/// Planar layouts store the luma plane first, followed by the chroma plane(s), each tightly packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl VideoFrame {
    pub fn new(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            data,
        }
    }

    /// Bytes required by this frame's layout, or `None` for layouts without a known size
    #[must_use]
    pub fn expected_len(&self) -> Option<usize> {
        Self::layout_len(self.format, self.width, self.height)
    }

    /// Bytes required by a layout at the given dimensions
    #[must_use]
    pub fn layout_len(format: PixelFormat, width: u32, height: u32) -> Option<usize> {
        let luma = width as usize * height as usize;
        let (cw, ch) = chroma_dimensions(width, height);
        let chroma = cw as usize * ch as usize;
        match format {
            PixelFormat::I420 | PixelFormat::Nv12 => Some(luma + 2 * chroma),
            PixelFormat::Rgba | PixelFormat::Bgra => Some(luma * 4),
            PixelFormat::Yuy2 => Some(width.div_ceil(2) as usize * 4 * height as usize),
            PixelFormat::Unknown(_) => None,
        }
    }

    /// Check dimensions and buffer length before any conversion touches the data
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FilterError::inference(format!(
                "Invalid frame dimensions: {}x{}",
                self.width, self.height
            )));
        }

        if self.width > MAX_FRAME_DIMENSION || self.height > MAX_FRAME_DIMENSION {
            return Err(FilterError::inference(format!(
                "Frame dimensions too large: {}x{} (max {}x{})",
                self.width, self.height, MAX_FRAME_DIMENSION, MAX_FRAME_DIMENSION
            )));
        }

        if let Some(expected) = self.expected_len() {
            if self.data.len() < expected {
                return Err(FilterError::inference(format!(
                    "Frame data size mismatch for {}: expected {} bytes, got {} bytes",
                    self.format,
                    expected,
                    self.data.len()
                )));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Postprocessed foreground mask, values in [0,1], sized to its frame
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationMask {
    buffer: MaskBuffer,
}

impl SegmentationMask {
    #[must_use]
    pub fn new(buffer: MaskBuffer) -> Self {
        Self { buffer }
    }

    /// Mask with every pixel set to `value`
    #[must_use]
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        Self::new(ImageBuffer::from_pixel(width, height, Luma([value])))
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    #[must_use]
    pub fn alpha(&self, x: u32, y: u32) -> f32 {
        self.buffer.get_pixel(x, y)[0]
    }

    #[must_use]
    pub fn as_buffer(&self) -> &MaskBuffer {
        &self.buffer
    }

    #[must_use]
    pub fn into_buffer(self) -> MaskBuffer {
        self.buffer
    }

    /// Fraction of pixels considered foreground (alpha above 0.5)
    #[must_use]
    pub fn foreground_ratio(&self) -> f32 {
        let total = self.buffer.len();
        if total == 0 {
            return 0.0;
        }
        let fg = self.buffer.iter().filter(|&&a| a > 0.5).count();
        fg as f32 / total as f32
    }
}
