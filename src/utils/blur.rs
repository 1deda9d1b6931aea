//! Separable Gaussian blur on float images
//!
//! Kernel sizes are explicit and odd; sigma is derived from the size the same way common
//! computer-vision libraries do when no sigma is given. Pixels past the border take the value
//! of the nearest edge pixel.

use crate::error::{FilterError, Result};
use crate::types::{MaskBuffer, WorkImage};
use imageproc::filter::separable_filter_equal;

/// Odd kernel size for a strength value, `2 * strength + 1`
#[must_use]
pub const fn kernel_size_for(strength: u32) -> u32 {
    2 * strength + 1
}

/// Sigma implied by a kernel size
#[must_use]
pub fn sigma_for_kernel(kernel_size: u32) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalized 1-D Gaussian weights for an odd kernel size
pub fn gaussian_kernel(kernel_size: u32) -> Result<Vec<f32>> {
    if kernel_size == 0 || kernel_size % 2 == 0 {
        return Err(FilterError::internal(format!(
            "Blur kernel size must be odd and positive, got {}",
            kernel_size
        )));
    }
    if kernel_size == 1 {
        return Ok(vec![1.0]);
    }

    let radius = (kernel_size / 2) as i64;
    let sigma = f64::from(sigma_for_kernel(kernel_size));
    let denom = 2.0 * sigma * sigma;

    let weights: Vec<f64> = (-radius..=radius)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    if sum <= 0.0 {
        return Err(FilterError::internal("Gaussian kernel sum is zero"));
    }

    Ok(weights.iter().map(|w| (w / sum) as f32).collect())
}

/// Blur every channel of a work image
pub fn blur_work_image(image: &WorkImage, kernel_size: u32) -> Result<WorkImage> {
    let kernel = gaussian_kernel(kernel_size)?;
    if kernel.len() == 1 || image.width() == 0 || image.height() == 0 {
        return Ok(image.clone());
    }
    Ok(separable_filter_equal(image, &kernel))
}

/// Blur a single-channel mask
pub fn blur_mask(mask: &MaskBuffer, kernel_size: u32) -> Result<MaskBuffer> {
    let kernel = gaussian_kernel(kernel_size)?;
    if kernel.len() == 1 || mask.width() == 0 || mask.height() == 0 {
        return Ok(mask.clone());
    }
    Ok(separable_filter_equal(mask, &kernel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    #[test]
    fn kernel_sizes_are_odd() {
        assert_eq!(kernel_size_for(15), 31);
        assert_eq!(kernel_size_for(3), 7);
        assert_eq!(kernel_size_for(1), 3);
    }

    #[test]
    fn sigma_matches_size_rule() {
        assert!((sigma_for_kernel(7) - 1.4).abs() < 1e-6);
        assert!((sigma_for_kernel(31) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(31).unwrap();
        assert_eq!(k.len(), 31);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..15 {
            assert!((k[i] - k[30 - i]).abs() < 1e-7);
        }
        assert!(gaussian_kernel(4).is_err());
        assert!(gaussian_kernel(0).is_err());
    }

    #[test]
    fn blur_constant_image_is_identity() {
        let image: WorkImage = ImageBuffer::from_pixel(6, 4, Rgb([0.2, 0.4, 0.6]));
        let out = blur_work_image(&image, 31).unwrap();
        for (a, b) in image.as_raw().iter().zip(out.as_raw()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn blur_spreads_energy_from_single_pixel() {
        let mut mask: MaskBuffer = ImageBuffer::new(7, 7);
        mask.put_pixel(3, 3, Luma([1.0]));
        let out = blur_mask(&mask, 5).unwrap();

        let nonzero = out.iter().filter(|&&v| v > 0.0).count();
        assert!(nonzero > 1);
        let total: f32 = out.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(out.get_pixel(3, 3)[0] < 1.0);
    }

    #[test]
    fn kernel_size_one_is_identity() {
        let mask: MaskBuffer = ImageBuffer::from_raw(2, 2, vec![0.1, 0.9, 0.3, 0.7]).unwrap();
        assert_eq!(blur_mask(&mask, 1).unwrap(), mask);
        assert!(blur_mask(&mask, 2).is_err());
    }

    #[test]
    fn edges_replicate_border_pixels() {
        // A step at the left edge stays a step: nothing outside the image pulls it down
        let mask: MaskBuffer = ImageBuffer::from_fn(9, 3, |x, _| Luma([if x < 4 { 1.0 } else { 0.0 }]));
        let out = blur_mask(&mask, 5).unwrap();
        assert!((out.get_pixel(0, 1)[0] - 1.0).abs() < 1e-5);
        assert!(out.get_pixel(8, 1)[0].abs() < 1e-5);
        assert!(out.get_pixel(4, 1)[0] > 0.0 && out.get_pixel(4, 1)[0] < 0.5);
    }

    #[test]
    fn wide_kernel_on_tiny_image_stays_finite() {
        let image: WorkImage = ImageBuffer::from_fn(2, 2, |x, y| Rgb([x as f32, y as f32, 0.5]));
        let out = blur_work_image(&image, 31).unwrap();
        assert_eq!(out.dimensions(), (2, 2));
        assert!(out.as_raw().iter().all(|v| v.is_finite() && (-1e-5..=1.0 + 1e-5).contains(v)));
    }
}
