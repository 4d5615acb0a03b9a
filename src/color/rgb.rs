// rgb.rs
use super::{B10, ColorHandler, Hex, Hsl, check_range};
use crate::error::ColorError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Builds a color from raw channel values, each of which must be in 0..=255.
    pub fn new(r: u32, g: u32, b: u32) -> Result<Self, ColorError> {
        Ok(Self {
            r: channel("Red", r)?,
            g: channel("Green", g)?,
            b: channel("Blue", b)?,
        })
    }

    pub const fn from_bytes(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn luminance(&self) -> f64 {
        let (r, g, b) = (f64::from(self.r), f64::from(self.g), f64::from(self.b));
        0.299 * r.powi(2) + 0.587 * g.powi(2) + 0.114 * b.powi(2)
    }
}

fn channel(name: &'static str, value: u32) -> Result<u8, ColorError> {
    check_range(name, f64::from(value), 0, 255)?;
    Ok(value as u8)
}

impl ColorHandler for Rgb {
    fn rgb(&self) -> Rgb {
        *self
    }

    fn hex(&self) -> Hex {
        Hex::from_bytes(self.r, self.g, self.b)
    }

    fn hsl(&self) -> Hsl {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if max == min {
            // Achromatic
            return Hsl::from_parts(0.0, 0.0, l * 100.0);
        }

        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsl::from_parts(h * 60.0, s * 100.0, l * 100.0)
    }

    fn b10(&self) -> B10 {
        B10::from_packed((u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_channels_above_255() {
        let err = Rgb::new(12, 256, 0).unwrap_err();
        assert!(matches!(err, ColorError::OutOfRange { channel: "Green", .. }));
    }

    #[test]
    fn converts_primary_colors_to_hsl() {
        let red = Rgb::from_bytes(255, 0, 0).hsl();
        assert_eq!((red.h, red.s, red.l), (0.0, 100.0, 50.0));

        let blue = Rgb::from_bytes(0, 0, 255).hsl();
        assert_eq!((blue.h, blue.s, blue.l), (240.0, 100.0, 50.0));
    }

    #[test]
    fn grey_has_no_saturation() {
        let grey = Rgb::from_bytes(128, 128, 128).hsl();
        assert_eq!(grey.h, 0.0);
        assert_eq!(grey.s, 0.0);
    }

    #[test]
    fn packs_into_decimal() {
        assert_eq!(Rgb::from_bytes(0x12, 0x34, 0x56).b10().value(), 0x123456);
    }

    #[test]
    fn luminance_weights_green_highest() {
        let green = Rgb::from_bytes(0, 255, 0).luminance();
        let red = Rgb::from_bytes(255, 0, 0).luminance();
        assert!(green > red);
    }
}
