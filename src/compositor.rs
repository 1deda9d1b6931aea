//! Alpha compositing of the frame against its new background
//!
//! All blending happens on unclamped `f32` work images; quantization happens only when the
//! result is written back to the host frame.

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};
use crate::types::{SegmentationMask, WorkImage};
use crate::utils::blur;
use image::{ImageBuffer, Rgb};

/// Which background the compositor blended against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// Flat replacement color
    Replace,
    /// Blurred copy of the frame
    Blur,
    /// Neither flag set; output equals input
    None,
}

impl CompositeMode {
    #[must_use]
    pub fn for_config(config: &FilterConfig) -> Self {
        if config.replace_background() {
            Self::Replace
        } else if config.blur_background() {
            Self::Blur
        } else {
            Self::None
        }
    }
}

/// Blends an original image with a background using a foreground mask
pub struct FrameCompositor;

impl FrameCompositor {
    /// Composite according to the config: replacement wins over blur, and with neither flag the
    /// original is returned unchanged
    pub fn composite(
        original: &WorkImage,
        mask: &SegmentationMask,
        config: &FilterConfig,
    ) -> Result<WorkImage> {
        Self::check_dimensions(original, mask)?;

        match CompositeMode::for_config(config) {
            CompositeMode::Replace => Ok(Self::blend_color(
                original,
                mask,
                config.replacement_color().to_unit(),
            )),
            CompositeMode::Blur => {
                let blurred = blur::blur_work_image(original, config.blur_kernel_size())?;
                Self::blend(original, &blurred, mask)
            },
            CompositeMode::None => Ok(original.clone()),
        }
    }

    /// `original * alpha + background * (1 - alpha)` per pixel
    pub fn blend(
        original: &WorkImage,
        background: &WorkImage,
        mask: &SegmentationMask,
    ) -> Result<WorkImage> {
        Self::check_dimensions(original, mask)?;
        if background.dimensions() != original.dimensions() {
            return Err(FilterError::inference(format!(
                "Background is {:?} but frame is {:?}",
                background.dimensions(),
                original.dimensions()
            )));
        }

        let (width, height) = original.dimensions();
        Ok(ImageBuffer::from_fn(width, height, |x, y| {
            let alpha = mask.alpha(x, y);
            let fg = original.get_pixel(x, y).0;
            let bg = background.get_pixel(x, y).0;
            Rgb([
                mix(fg[0], bg[0], alpha),
                mix(fg[1], bg[1], alpha),
                mix(fg[2], bg[2], alpha),
            ])
        }))
    }

    /// Blend against a flat unit-range RGB color
    #[must_use]
    pub fn blend_color(original: &WorkImage, mask: &SegmentationMask, color: [f32; 3]) -> WorkImage {
        let (width, height) = original.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            let alpha = mask.alpha(x, y);
            let fg = original.get_pixel(x, y).0;
            Rgb([
                mix(fg[0], color[0], alpha),
                mix(fg[1], color[1], alpha),
                mix(fg[2], color[2], alpha),
            ])
        })
    }

    fn check_dimensions(original: &WorkImage, mask: &SegmentationMask) -> Result<()> {
        if original.dimensions() != mask.dimensions() {
            return Err(FilterError::inference(format!(
                "Mask is {:?} but frame is {:?}",
                mask.dimensions(),
                original.dimensions()
            )));
        }
        Ok(())
    }
}

/// Linear alpha blend; exact at alpha 0 and 1
#[inline]
fn mix(foreground: f32, background: f32, alpha: f32) -> f32 {
    if alpha >= 1.0 {
        foreground
    } else if alpha <= 0.0 {
        background
    } else {
        foreground * alpha + background * (1.0 - alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilterSettings, ReplacementColor};

    fn gradient(width: u32, height: u32) -> WorkImage {
        ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([x as f32 / width as f32, y as f32 / height as f32, 0.25])
        })
    }

    fn config(replace: bool, blur: bool) -> FilterConfig {
        FilterConfig::from_settings(&FilterSettings {
            replace_background: replace,
            blur_background: blur,
            blur_amount: 2,
            replacement_color: ReplacementColor::from_rgb(0, 0, 255),
            ..FilterSettings::default()
        })
    }

    #[test]
    fn test_full_mask_is_identity() {
        let image = gradient(12, 8);
        let mask = SegmentationMask::filled(12, 8, 1.0);
        for (replace, blur) in [(true, false), (false, true), (false, false)] {
            let out = FrameCompositor::composite(&image, &mask, &config(replace, blur)).unwrap();
            assert_eq!(out, image);
        }
    }

    #[test]
    fn test_empty_mask_replace_gives_color() {
        let image = gradient(6, 4);
        let mask = SegmentationMask::filled(6, 4, 0.0);
        let out = FrameCompositor::composite(&image, &mask, &config(true, false)).unwrap();
        assert!(out.pixels().all(|p| p.0 == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_empty_mask_blur_gives_blurred_copy() {
        let image = gradient(10, 10);
        let mask = SegmentationMask::filled(10, 10, 0.0);
        let cfg = config(false, true);
        let out = FrameCompositor::composite(&image, &mask, &cfg).unwrap();
        let blurred = blur::blur_work_image(&image, cfg.blur_kernel_size()).unwrap();
        assert_eq!(out, blurred);
    }

    #[test]
    fn test_replace_takes_precedence_over_blur() {
        let image = gradient(4, 4);
        let mask = SegmentationMask::filled(4, 4, 0.0);
        let out = FrameCompositor::composite(&image, &mask, &config(true, true)).unwrap();
        assert!(out.pixels().all(|p| p.0 == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_no_flags_ignores_mask() {
        let image = gradient(4, 4);
        let mask = SegmentationMask::filled(4, 4, 0.0);
        let out = FrameCompositor::composite(&image, &mask, &config(false, false)).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn test_half_alpha_is_midpoint() {
        let image: WorkImage = ImageBuffer::from_pixel(2, 2, Rgb([1.0, 0.0, 0.5]));
        let mask = SegmentationMask::filled(2, 2, 0.5);
        let out = FrameCompositor::blend_color(&image, &mask, [0.0, 1.0, 0.5]);
        assert_eq!(out.get_pixel(0, 0).0, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_mismatched_mask_is_error() {
        let image = gradient(4, 4);
        let mask = SegmentationMask::filled(3, 4, 1.0);
        assert!(FrameCompositor::composite(&image, &mask, &config(true, false)).is_err());
    }
}
