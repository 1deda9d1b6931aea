//! Range validation for the filter's tunables

use super::NumericValidator;
use crate::config::{DEFAULT_BLUR_AMOUNT, DEFAULT_EDGE_SMOOTHING, DEFAULT_THRESHOLD};
use crate::error::Result;

/// Inclusive range of the background blur strength
pub const BLUR_AMOUNT_RANGE: (i64, i64) = (1, 50);
/// Inclusive range of the edge smoothing strength
pub const EDGE_SMOOTHING_RANGE: (i64, i64) = (1, 10);

/// Validator for the threshold / blur / smoothing triple
pub struct ConfigValidator;

impl ConfigValidator {
    /// `true` iff every value is inside its range
    ///
    /// Each failing value is logged; callers substitute [`ConfigValidator::safe_defaults`] for the
    /// whole triple when this returns `false`.
    #[must_use]
    pub fn validate(threshold: f32, blur_amount: i64, edge_smoothing: i64) -> bool {
        match Self::check(threshold, blur_amount, edge_smoothing) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{}", e);
                false
            }
        }
    }

    /// Like [`ConfigValidator::validate`], but reports the first failing value as an error
    pub fn check(threshold: f32, blur_amount: i64, edge_smoothing: i64) -> Result<()> {
        NumericValidator::validate_unit_interval(threshold, "threshold")?;
        NumericValidator::validate_range(
            blur_amount,
            BLUR_AMOUNT_RANGE.0,
            BLUR_AMOUNT_RANGE.1,
            "blur_amount",
        )?;
        NumericValidator::validate_range(
            edge_smoothing,
            EDGE_SMOOTHING_RANGE.0,
            EDGE_SMOOTHING_RANGE.1,
            "edge_smoothing",
        )?;
        Ok(())
    }

    /// The fixed fallback triple `(threshold, blur_amount, edge_smoothing)`
    #[must_use]
    pub fn safe_defaults() -> (f32, u32, u32) {
        (DEFAULT_THRESHOLD, DEFAULT_BLUR_AMOUNT, DEFAULT_EDGE_SMOOTHING)
    }
}
