//! Colours and the temperature colour scale.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{MapError, Result};

/// RGB color as (r, g, b) with values in 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    /// Parse `#RRGGBB` or `#RGB` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        let invalid = || MapError::invalid_config("color", hex, "expected #RRGGBB or #RGB");

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());

        match digits.len() {
            6 => Ok(Self::new(
                channel(&digits[0..2])?,
                channel(&digits[2..4])?,
                channel(&digits[4..6])?,
            )),
            3 => {
                // #abc is shorthand for #aabbcc
                let r = channel(&digits[0..1])?;
                let g = channel(&digits[1..2])?;
                let b = channel(&digits[2..3])?;
                Ok(Self::new(r * 17, g * 17, b * 17))
            }
            _ => Err(invalid()),
        }
    }

    /// Linear interpolation towards `other`, `t` in [0, 1]
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Rgb::from_hex(s)
    }
}

impl TryFrom<String> for Rgb {
    type Error = MapError;

    fn try_from(s: String) -> Result<Self> {
        Rgb::from_hex(&s)
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_string()
    }
}

/// Two-colour gradient used for site temperatures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScale {
    pub low: Rgb,
    pub high: Rgb,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            low: Rgb::new(0x2C, 0x7B, 0xB6),
            high: Rgb::new(0xD7, 0x19, 0x1C),
        }
    }
}

impl ColorScale {
    pub fn new(low: Rgb, high: Rgb) -> Self {
        Self { low, high }
    }

    /// Colour for `value` on the domain `[min, max]`.
    ///
    /// Values outside the domain are clamped; a zero-width domain maps to `low`.
    pub fn color_at(&self, value: f64, min: f64, max: f64) -> Rgb {
        let span = max - min;
        if !span.is_finite() || span <= f64::EPSILON || !value.is_finite() {
            return self.low;
        }
        self.low.lerp(self.high, (value - min) / span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgb::from_hex("#2C7BB6").unwrap(), Rgb::new(0x2C, 0x7B, 0xB6));
        assert_eq!(Rgb::from_hex("d7191c").unwrap(), Rgb::new(0xD7, 0x19, 0x1C));
        assert_eq!(Rgb::from_hex("#fff").unwrap(), Rgb::WHITE);
        assert_eq!(Rgb::new(1, 2, 255).to_string(), "#0102FF");
    }

    #[test]
    fn test_hex_rejects_garbage() {
        for bad in ["", "#12", "#12345", "#GGGGGG", "blue", "#+1+2+3"] {
            assert!(Rgb::from_hex(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_scale_endpoints() {
        let scale = ColorScale::new(Rgb::BLACK, Rgb::WHITE);
        assert_eq!(scale.color_at(12.0, 12.0, 14.0), Rgb::BLACK);
        assert_eq!(scale.color_at(14.0, 12.0, 14.0), Rgb::WHITE);
        assert_eq!(scale.color_at(13.0, 12.0, 14.0), Rgb::new(128, 128, 128));
    }

    #[test]
    fn test_scale_clamps() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_at(-40.0, 0.0, 10.0), scale.low);
        assert_eq!(scale.color_at(40.0, 0.0, 10.0), scale.high);
    }

    #[test]
    fn test_degenerate_domain() {
        let scale = ColorScale::default();
        assert_eq!(scale.color_at(5.0, 5.0, 5.0), scale.low);
    }
}
