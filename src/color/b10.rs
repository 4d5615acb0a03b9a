// b10.rs
use super::{ColorHandler, Rgb, check_range};
use crate::error::ColorError;
use std::fmt;

const MAX: u32 = 0xFF_FF_FF;

/// A color packed into a single decimal integer, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct B10(u32);

impl B10 {
    pub fn new(value: u32) -> Result<Self, ColorError> {
        check_range("B10", f64::from(value), 0, MAX)?;
        Ok(Self(value))
    }

    pub(crate) const fn from_packed(value: u32) -> Self {
        Self(value & MAX)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl ColorHandler for B10 {
    fn rgb(&self) -> Rgb {
        Rgb::from_bytes((self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8)
    }

    fn b10(&self) -> B10 {
        *self
    }
}

impl fmt::Display for B10 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
