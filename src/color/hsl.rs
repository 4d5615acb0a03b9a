// hsl.rs
use super::{ColorHandler, Rgb, check_range};
use crate::error::ColorError;
use std::fmt;

/// Hue in degrees (0 - 360), saturation and lightness in percent (0 - 100).
///
/// Components are kept as floats so that a conversion from RGB and back is
/// lossless up to the final rounding to bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Result<Self, ColorError> {
        check_range("Hue", h, 0, 360)?;
        check_range("Saturation", s, 0, 100)?;
        check_range("Lightness", l, 0, 100)?;
        Ok(Self { h, s, l })
    }

    // Only for values derived from a valid RGB triple.
    pub(crate) fn from_parts(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }

    fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            return p + (q - p) * 6.0 * t;
        }
        if t < 1.0 / 2.0 {
            return q;
        }
        if t < 2.0 / 3.0 {
            return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
        }
        p
    }
}

impl ColorHandler for Hsl {
    fn rgb(&self) -> Rgb {
        let h = self.h / 360.0;
        let s = self.s / 100.0;
        let l = self.l / 100.0;

        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                Self::hue_to_rgb(p, q, h + 1.0 / 3.0),
                Self::hue_to_rgb(p, q, h),
                Self::hue_to_rgb(p, q, h - 1.0 / 3.0),
            )
        };

        Rgb::from_bytes(to_byte(r), to_byte(g), to_byte(b))
    }

    fn hsl(&self) -> Hsl {
        *self
    }
}

fn to_byte(unit: f64) -> u8 {
    (unit * 255.0).round().clamp(0.0, 255.0) as u8
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({:.0}, {:.0}, {:.0})", self.h, self.s, self.l)
    }
}
