//! Numeric validation utilities
//!
//! Range checks for host-supplied tunables and safe conversions used when sizing buffers.

use crate::error::{FilterError, Result};

/// Validator for numeric ranges and conversions
pub struct NumericValidator;

impl NumericValidator {
    /// Validate a value lies in `[0.0, 1.0]`; non-finite values are rejected
    pub fn validate_unit_interval(value: f32, name: &str) -> Result<f32> {
        if !value.is_finite() {
            return Err(FilterError::config_validation(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        if !(0.0..=1.0).contains(&value) {
            return Err(FilterError::config_value_error(name, value, "0.0-1.0"));
        }

        Ok(value)
    }

    /// Validate numeric range (inclusive)
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> Result<T>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(FilterError::config_value_error(
                name,
                value,
                &format!("{}-{}", min, max),
            ));
        }
        Ok(value)
    }

    /// Safely compute `width * height * channels` as a buffer length
    pub fn buffer_len(width: u32, height: u32, channels: usize) -> Result<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(channels))
            .ok_or_else(|| {
                FilterError::internal(format!(
                    "Buffer size overflow: {}x{}x{}",
                    width, height, channels
                ))
            })
    }

    /// Convert a tensor dimension to a `u32` image dimension
    pub fn dimension_to_u32(value: usize, name: &str) -> Result<u32> {
        u32::try_from(value).map_err(|_| {
            FilterError::inference(format!("{} dimension {} exceeds u32::MAX", name, value))
        })
    }
}
