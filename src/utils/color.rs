//! Replacement color parsing

use crate::config::ReplacementColor;
use crate::error::{FilterError, Result};

/// Utility for parsing and formatting replacement colors
pub struct ColorParser;

impl ColorParser {
    /// Parse a hex color string
    ///
    /// Supports `#RRGGBB`, `#RGB` and `0xRRGGBB`; the `#`/`0x` prefix is optional.
    ///
    /// ```rust
    /// use bgremove_filter::utils::ColorParser;
    ///
    /// let green = ColorParser::parse_hex("#00ff00").unwrap();
    /// assert_eq!(green.rgb(), [0, 255, 0]);
    /// let red = ColorParser::parse_hex("f00").unwrap();
    /// assert_eq!(red.rgb(), [255, 0, 0]);
    /// ```
    pub fn parse_hex(hex: &str) -> Result<ReplacementColor> {
        let trimmed = hex.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if !Self::is_valid_hex(digits) {
            return Err(FilterError::config_validation(format!(
                "Color must be in #RRGGBB or #RGB format, got '{}'",
                hex
            )));
        }

        let value = u32::from_str_radix(digits, 16).map_err(|e| {
            FilterError::config_validation(format!("Invalid hex color '{}': {}", hex, e))
        })?;

        if digits.len() == 3 {
            // Expand #RGB to #RRGGBB
            let r = ((value >> 8) & 0xF) as u8 * 17;
            let g = ((value >> 4) & 0xF) as u8 * 17;
            let b = (value & 0xF) as u8 * 17;
            Ok(ReplacementColor::from_rgb(r, g, b))
        } else {
            Ok(ReplacementColor(value))
        }
    }

    /// Format a color as `#rrggbb`
    #[must_use]
    pub fn to_hex(color: ReplacementColor) -> String {
        let [r, g, b] = color.rgb();
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }

    /// Validate hex digits without parsing (prefix already stripped)
    #[must_use]
    pub fn is_valid_hex(digits: &str) -> bool {
        (digits.len() == 3 || digits.len() == 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6_digit() {
        assert_eq!(ColorParser::parse_hex("#ffffff").unwrap().rgb(), [255, 255, 255]);
        assert_eq!(ColorParser::parse_hex("0x123456").unwrap().rgb(), [0x12, 0x34, 0x56]);
        assert_eq!(ColorParser::parse_hex("00FF00").unwrap().rgb(), [0, 255, 0]);
    }

    #[test]
    fn test_parse_hex_3_digit() {
        assert_eq!(ColorParser::parse_hex("#f80").unwrap().rgb(), [255, 136, 0]);
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert!(ColorParser::parse_hex("#ff").is_err());
        assert!(ColorParser::parse_hex("#gggggg").is_err());
        assert!(ColorParser::parse_hex("").is_err());
        assert!(ColorParser::parse_hex("#+12345").is_err());
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(ColorParser::to_hex(ReplacementColor::from_rgb(255, 0, 128)), "#ff0080");
    }
}
