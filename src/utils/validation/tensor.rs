//! Tensor shape validation for model inputs and outputs

use crate::error::{FilterError, Result};
use ndarray::Array4;

/// Validator for NCHW tensors exchanged with the inference engine
pub struct TensorValidator;

impl TensorValidator {
    /// Validate a preprocessed input tensor is `[1, 3, H, W]`
    pub fn validate_input_tensor(tensor: &Array4<f32>) -> Result<()> {
        let shape = tensor.shape();
        if shape.first().copied() != Some(1) || shape.get(1).copied() != Some(3) {
            return Err(FilterError::inference(format!(
                "Input tensor must be [1, 3, H, W], got {:?}",
                shape
            )));
        }
        Ok(())
    }

    /// Validate a raw model output is `[1, 1, H, W]` with non-zero spatial size
    ///
    /// Returns the output spatial size as `(width, height)`.
    pub fn validate_mask_output(tensor: &Array4<f32>) -> Result<(usize, usize)> {
        let shape = tensor.shape();
        let (batch, channels, height, width) = (
            shape.first().copied().unwrap_or(0),
            shape.get(1).copied().unwrap_or(0),
            shape.get(2).copied().unwrap_or(0),
            shape.get(3).copied().unwrap_or(0),
        );

        if batch != 1 || channels != 1 {
            return Err(FilterError::inference(format!(
                "Model output must have batch size 1 and a single channel, got {:?}",
                shape
            )));
        }

        if width == 0 || height == 0 {
            return Err(FilterError::inference(format!(
                "Model output has empty spatial size: {:?}",
                shape
            )));
        }

        Ok((width, height))
    }

    /// Validate a dynamic-rank output shape before converting it to 4 dimensions
    pub fn validate_rank(shape: &[usize], expected: usize) -> Result<()> {
        if shape.len() != expected {
            return Err(FilterError::inference(format!(
                "Tensor must have {} dimensions, got {} ({:?})",
                expected,
                shape.len(),
                shape
            )));
        }
        Ok(())
    }
}
