// hex.rs
use super::{ColorHandler, Rgb};
use crate::error::ColorError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hex {
    rgb: Rgb,
}

impl Hex {
    pub const fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self {
            rgb: Rgb::from_bytes(r, g, b),
        }
    }

    /// Parses `rgb` or `rrggbb` digits, without the leading `#`.
    pub fn from_digits(digits: &str) -> Result<Self, ColorError> {
        let unsupported = || ColorError::Unsupported(format!("#{digits}"));
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(unsupported());
        }

        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(unsupported()),
        };

        let byte = |i: usize| {
            u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| unsupported())
        };
        Ok(Self::from_bytes(byte(0)?, byte(2)?, byte(4)?))
    }
}

impl ColorHandler for Hex {
    fn rgb(&self) -> Rgb {
        self.rgb
    }

    fn hex(&self) -> Hex {
        *self
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.rgb.r, self.rgb.g, self.rgb.b)
    }
}
