//! Raw model output to alpha mask
//!
//! Logits go through a sigmoid, values at or below the threshold are zeroed (values above keep
//! their soft probability), the map is resized to the frame with linear interpolation, and an
//! optional Gaussian low-pass softens the cutout edge.

use crate::error::Result;
use crate::types::{MaskBuffer, SegmentationMask};
use crate::utils::blur;
use crate::utils::validation::{NumericValidator, TensorValidator};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::Array4;

/// Logistic function `1 / (1 + e^-x)`
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Converts raw single-channel logits into frame-sized masks
pub struct MaskPostprocessor;

impl MaskPostprocessor {
    /// Full postprocessing chain for one frame
    ///
    /// `raw` must be a `[1, 1, h, w]` tensor; its own shape is authoritative for the output size.
    /// `smoothing_kernel` is the odd Gaussian kernel size, or `None` to skip smoothing.
    #[allow(clippy::indexing_slicing)]
    // Safe: the mask is built from the validated output shape
    pub fn postprocess(
        raw: &Array4<f32>,
        target_size: (u32, u32),
        threshold: f32,
        smoothing_kernel: Option<u32>,
    ) -> Result<SegmentationMask> {
        let (out_w, out_h) = TensorValidator::validate_mask_output(raw)?;
        let out_w = NumericValidator::dimension_to_u32(out_w, "output width")?;
        let out_h = NumericValidator::dimension_to_u32(out_h, "output height")?;

        let mut probabilities: MaskBuffer = ImageBuffer::from_fn(out_w, out_h, |x, y| {
            Luma([sigmoid(raw[[0, 0, y as usize, x as usize]])])
        });
        Self::apply_threshold(&mut probabilities, threshold);

        let mut mask = Self::resize(&probabilities, target_size);

        if let Some(kernel_size) = smoothing_kernel {
            mask = blur::blur_mask(&mask, kernel_size)?;
        }

        // Interpolation and blur can drift a hair outside [0,1]
        for value in mask.iter_mut() {
            *value = value.clamp(0.0, 1.0);
        }

        Ok(SegmentationMask::new(mask))
    }

    /// Zero every value at or below `threshold`, leaving the rest unchanged
    ///
    /// Idempotent: applying it twice with the same threshold changes nothing further.
    pub fn apply_threshold(mask: &mut MaskBuffer, threshold: f32) {
        for value in mask.iter_mut() {
            if *value <= threshold {
                *value = 0.0;
            }
        }
    }

    /// Linear resize to `(width, height)`
    #[must_use]
    pub fn resize(mask: &MaskBuffer, target_size: (u32, u32)) -> MaskBuffer {
        if mask.dimensions() == target_size {
            return mask.clone();
        }
        imageops::resize(mask, target_size.0, target_size.1, FilterType::Triangle)
    }
}
