use std::{fmt, str::FromStr};

use crate::error::ColorParseError;

/// Linear RGB paint color, each channel in 0..=1
///
/// Hex strings are taken at face value: `#ff0000` is `(1, 0, 0)` with no
/// sRGB decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl PaintColor {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// `#rrggbb` form
    pub fn to_hex(self) -> String {
        let channel = |c: f32| (c * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

impl Default for PaintColor {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

impl From<[f32; 3]> for PaintColor {
    fn from(rgb: [f32; 3]) -> Self {
        Self::new(rgb[0], rgb[1], rgb[2])
    }
}

impl fmt::Display for PaintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PaintColor {
    type Err = ColorParseError;

    /// Parses `#rgb` or `#rrggbb` (case-insensitive)
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError {
            input: input.to_string(),
        };

        let hex = input.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let digits: Vec<u8> = match hex.len() {
            3 => hex
                .chars()
                .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
                .collect::<Option<_>>()
                .ok_or_else(err)?,
            6 => (0..3)
                .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok())
                .collect::<Option<_>>()
                .ok_or_else(err)?,
            _ => return Err(err()),
        };

        Ok(Self::new(
            digits[0] as f32 / 255.0,
            digits[1] as f32 / 255.0,
            digits[2] as f32 / 255.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_forms() {
        assert_eq!("#ff0000".parse::<PaintColor>().unwrap(), PaintColor::new(1.0, 0.0, 0.0));
        assert_eq!("#0F0".parse::<PaintColor>().unwrap(), PaintColor::new(0.0, 1.0, 0.0));

        let grey: PaintColor = "#808080".parse().unwrap();
        assert!((grey.r - 128.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_malformed_strings() {
        for input in ["ff0000", "#ff00", "#gg0000", "", "#", "#ff00000"] {
            let err = input.parse::<PaintColor>().unwrap_err();
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(PaintColor::new(1.0, 0.5, 0.0).to_string(), "#ff8000");
    }
}
