//! Model input preprocessing
//!
//! Turns a [`WorkImage`] into the normalized NCHW tensor the segmentation model expects.

use crate::error::{FilterError, Result};
use crate::types::WorkImage;
use image::imageops::{self, FilterType};
use ndarray::Array4;

/// Per-channel normalization constants, applied after scaling pixels to [0,1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessingConfig {
    pub normalization_mean: [f32; 3],
    pub normalization_std: [f32; 3],
}

impl Default for PreprocessingConfig {
    /// ImageNet statistics in RGB order
    fn default() -> Self {
        Self {
            normalization_mean: [0.485, 0.456, 0.406],
            normalization_std: [0.229, 0.224, 0.225],
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Resize to the model input size and normalize into a `[1, 3, H, W]` tensor
    ///
    /// Planes are laid out R, G, B to match the ImageNet statistics, not in BGR order, whatever
    /// byte layout the host frame used.
    ///
    /// The image is stretched to `input_size` (no letterboxing), since the mask is stretched back
    /// to the frame afterwards.
    pub fn preprocess(
        image: &WorkImage,
        input_size: (u32, u32),
        config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let (target_width, target_height) = input_size;
        if target_width == 0 || target_height == 0 {
            return Err(FilterError::inference(format!(
                "Invalid model input size: {}x{}",
                target_width, target_height
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(FilterError::inference("Cannot preprocess an empty image"));
        }

        let resized = if image.dimensions() == input_size {
            image.clone()
        } else {
            imageops::resize(image, target_width, target_height, FilterType::Triangle)
        };

        Ok(Self::image_to_tensor(&resized, config))
    }

    /// Convert an image to a normalized NCHW tensor
    fn image_to_tensor(image: &WorkImage, config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = image.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        #[allow(clippy::indexing_slicing)]
        // Safe: tensor dimensions pre-allocated to match the image size
        for (x, y, pixel) in image.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let value = pixel[c].clamp(0.0, 1.0);
                tensor[[0, c, y, x]] =
                    (value - config.normalization_mean[c]) / config.normalization_std[c];
            }
        }

        tensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn create_test_image(width: u32, height: u32, color: [f32; 3]) -> WorkImage {
        ImageBuffer::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn test_preprocess_shape() {
        let image = create_test_image(64, 48, [1.0, 0.0, 0.0]);
        let tensor =
            ImagePreprocessor::preprocess(&image, (32, 16), &PreprocessingConfig::default())
                .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 16, 32]);
    }

    #[test]
    fn test_normalization_values() {
        let config = PreprocessingConfig::default();
        let image = create_test_image(4, 4, [1.0, 0.0, 0.5]);
        let tensor = ImagePreprocessor::preprocess(&image, (4, 4), &config).unwrap();

        let r = (1.0 - 0.485) / 0.229;
        let g = (0.0 - 0.456) / 0.224;
        let b = (0.5 - 0.406) / 0.225;
        assert!((tensor[[0, 0, 2, 2]] - r).abs() < 1e-5);
        assert!((tensor[[0, 1, 2, 2]] - g).abs() < 1e-5);
        assert!((tensor[[0, 2, 2, 2]] - b).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = PreprocessingConfig::default();
        let image = create_test_image(2, 2, [1.2, -0.1, 0.0]);
        let tensor = ImagePreprocessor::preprocess(&image, (2, 2), &config).unwrap();
        assert!((tensor[[0, 0, 0, 0]] - (1.0 - 0.485) / 0.229).abs() < 1e-5);
        assert!((tensor[[0, 1, 0, 0]] - (0.0 - 0.456) / 0.224).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_sizes() {
        let config = PreprocessingConfig::default();
        let image = create_test_image(4, 4, [0.5; 3]);
        assert!(ImagePreprocessor::preprocess(&image, (0, 4), &config).is_err());

        let empty: WorkImage = ImageBuffer::new(0, 0);
        assert!(ImagePreprocessor::preprocess(&empty, (4, 4), &config).is_err());
    }

    #[test]
    fn test_planes_follow_rgb_order() {
        use crate::color_space::ColorSpaceBridge;
        use crate::types::{PixelFormat, VideoFrame};

        let identity = PreprocessingConfig {
            normalization_mean: [0.0; 3],
            normalization_std: [1.0; 3],
        };
        let pixel = [255u8, 0, 51, 255];
        let frame = VideoFrame::new(PixelFormat::Rgba, 2, 2, pixel.repeat(4));
        let work = ColorSpaceBridge::to_work_image(&frame).unwrap();
        let tensor = ImagePreprocessor::preprocess(&work, (2, 2), &identity).unwrap();

        assert!((tensor[[0, 0, 1, 1]] - 1.0).abs() < 1e-5);
        assert!(tensor[[0, 1, 1, 1]].abs() < 1e-5);
        assert!((tensor[[0, 2, 1, 1]] - 0.2).abs() < 1e-5);
    }
}
