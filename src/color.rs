//! Opaque sRGB colors and the two fixed catalog palettes.

use std::fmt;
use std::str::FromStr;

use image::{Rgb, Rgba};

use crate::error::Error;

/// An opaque sRGB color, written and parsed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorSpec {
    red: u8,
    green: u8,
    blue: u8,
}

impl ColorSpec {
    /// Build a color from its three channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Build a color from a packed `0xRRGGBB` value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_hex(rgb: u32) -> Self {
        Self {
            red: ((rgb >> 16) & 0xff) as u8,
            green: ((rgb >> 8) & 0xff) as u8,
            blue: (rgb & 0xff) as u8,
        }
    }

    /// The color as an opaque RGB pixel.
    #[must_use]
    pub const fn to_rgb(self) -> Rgb<u8> {
        Rgb([self.red, self.green, self.blue])
    }

    /// The color as a fully opaque RGBA pixel.
    #[must_use]
    pub const fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.red, self.green, self.blue, u8::MAX])
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.red, self.green, self.blue)
    }
}

impl FromStr for ColorSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.chars().all(|c| c.is_ascii_hexdigit()))
            .ok_or_else(|| Error::InvalidColor(s.to_string()))?;
        let packed = u32::from_str_radix(hex, 16).map_err(|_| Error::InvalidColor(s.to_string()))?;
        Ok(Self::from_hex(packed))
    }
}

/// Background fills used for catalog variants.
pub const BACKGROUND_PALETTE: [ColorSpec; 24] = [
    ColorSpec::from_hex(0xff477e),
    ColorSpec::from_hex(0xff5c8a),
    ColorSpec::from_hex(0xff7096),
    ColorSpec::from_hex(0xff85a1),
    ColorSpec::from_hex(0xff99ac),
    ColorSpec::from_hex(0xf9bcad),
    ColorSpec::from_hex(0xf8ad9d),
    ColorSpec::from_hex(0xf4978e),
    ColorSpec::from_hex(0xf08080),
    ColorSpec::from_hex(0xee6055),
    ColorSpec::from_hex(0x606c38),
    ColorSpec::from_hex(0x283618),
    ColorSpec::from_hex(0xdda15e),
    ColorSpec::from_hex(0xbc6c25),
    ColorSpec::from_hex(0x003049),
    ColorSpec::from_hex(0xd62828),
    ColorSpec::from_hex(0xf77f00),
    ColorSpec::from_hex(0xfcbf49),
    ColorSpec::from_hex(0xeae2b7),
    ColorSpec::from_hex(0x2a9d8f),
    ColorSpec::from_hex(0xe9c46a),
    ColorSpec::from_hex(0xf4a261),
    ColorSpec::from_hex(0xe76f51),
    ColorSpec::from_hex(0x264653),
];

/// Border strokes used for catalog variants.
pub const BORDER_PALETTE: [ColorSpec; 10] = [
    ColorSpec::from_hex(0xffffff),
    ColorSpec::from_hex(0x000000),
    ColorSpec::from_hex(0xffeb3b),
    ColorSpec::from_hex(0xff5722),
    ColorSpec::from_hex(0x4caf50),
    ColorSpec::from_hex(0x2196f3),
    ColorSpec::from_hex(0x9c27b0),
    ColorSpec::from_hex(0x795548),
    ColorSpec::from_hex(0x607d8b),
    ColorSpec::from_hex(0xe91e63),
];
