// color/mod.rs
//! Color literals as typed into settings forms.
//!
//! Supported inputs are `#rgb`/`#rrggbb`, `rgb(r, g, b)`/`rgba(r, g, b, a)`,
//! `hsl(h, s, l)`, a bare decimal of up to eight digits and `r`/`random`.

mod b10;
mod hex;
mod hsl;
mod rgb;

pub use b10::B10;
pub use hex::Hex;
pub use hsl::Hsl;
pub use rgb::Rgb;

use crate::error::ColorError;
use rand::Rng;
use std::fmt;

/// Conversions shared by every color representation.
pub trait ColorHandler {
    fn rgb(&self) -> Rgb;

    fn hex(&self) -> Hex {
        self.rgb().hex()
    }

    fn hsl(&self) -> Hsl {
        self.rgb().hsl()
    }

    fn b10(&self) -> B10 {
        self.rgb().b10()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    Hex(Hex),
    Rgb(Rgb),
    Hsl(Hsl),
    B10(B10),
}

impl Color {
    pub fn luminance(&self) -> f64 {
        self.rgb().luminance()
    }
}

impl ColorHandler for Color {
    fn rgb(&self) -> Rgb {
        match self {
            Color::Hex(c) => c.rgb(),
            Color::Rgb(c) => c.rgb(),
            Color::Hsl(c) => c.rgb(),
            Color::B10(c) => c.rgb(),
        }
    }

    fn hex(&self) -> Hex {
        match self {
            Color::Hex(c) => c.hex(),
            other => other.rgb().hex(),
        }
    }

    fn hsl(&self) -> Hsl {
        match self {
            Color::Hsl(c) => *c,
            other => other.rgb().hsl(),
        }
    }

    fn b10(&self) -> B10 {
        match self {
            Color::B10(c) => *c,
            other => other.rgb().b10(),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Hex(c) => c.fmt(f),
            Color::Rgb(c) => c.fmt(f),
            Color::Hsl(c) => c.fmt(f),
            Color::B10(c) => c.fmt(f),
        }
    }
}

impl std::str::FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parses a color literal. The first matching format wins; range errors from
/// a matching format are returned as is.
pub fn parse(input: &str) -> Result<Color, ColorError> {
    if input.eq_ignore_ascii_case("r") || input.eq_ignore_ascii_case("random") {
        return random();
    }

    if let Some(color) = parse_hex(input) {
        return color;
    }
    if let Some(color) = parse_b10(input) {
        return color;
    }
    if let Some(color) = parse_rgb(input) {
        return color;
    }
    if let Some(color) = parse_hsl(input) {
        return color;
    }

    Err(ColorError::Unsupported(input.to_string()))
}

/// A vivid, light color: any hue, saturation 75 - 100, lightness 65 - 100.
pub fn random() -> Result<Color, ColorError> {
    let mut rng = rand::thread_rng();
    let h = rng.gen_range(0..=360u32);
    let s = rng.gen_range(75..=100u32);
    let l = rng.gen_range(65..=100u32);
    Hsl::new(f64::from(h), f64::from(s), f64::from(l)).map(Color::Hsl)
}

pub(crate) fn check_range(
    channel: &'static str,
    value: f64,
    min: u32,
    max: u32,
) -> Result<(), ColorError> {
    if (f64::from(min)..=f64::from(max)).contains(&value) {
        Ok(())
    } else {
        Err(ColorError::OutOfRange {
            channel,
            min,
            max,
            value: value.to_string(),
        })
    }
}

fn parse_hex(input: &str) -> Option<Result<Color, ColorError>> {
    let digits = input.strip_prefix('#')?;
    if !matches!(digits.len(), 3 | 6) || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(Hex::from_digits(digits).map(Color::Hex))
}

fn parse_b10(input: &str) -> Option<Result<Color, ColorError>> {
    if !(1..=8).contains(&input.len()) || !input.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = input.parse::<u32>().ok()?;
    Some(B10::new(value).map(Color::B10))
}

fn parse_rgb(input: &str) -> Option<Result<Color, ColorError>> {
    let inner = strip_prefix_ignore_case(input, "rgba(")
        .or_else(|| strip_prefix_ignore_case(input, "rgb("))?
        .strip_suffix(')')?;
    let [r, g, b] = components(inner, true)?;
    Some(Rgb::new(r, g, b).map(Color::Rgb))
}

fn parse_hsl(input: &str) -> Option<Result<Color, ColorError>> {
    let inner = strip_prefix_ignore_case(input, "hsl(")?.strip_suffix(')')?;
    let [h, s, l] = components(inner, false)?;
    Some(Hsl::new(f64::from(h), f64::from(s), f64::from(l)).map(Color::Hsl))
}

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &input[prefix.len()..])
}

/// Three comma separated numbers of one to three digits, each comma followed by
/// at most one whitespace. With `trailing`, a non-empty `,<anything>` tail
/// (the alpha channel) is accepted and ignored.
fn components(inner: &str, trailing: bool) -> Option<[u32; 3]> {
    let mut rest = inner;
    let mut out = [0u32; 3];

    for (i, slot) in out.iter_mut().enumerate() {
        if i > 0 {
            rest = rest.strip_prefix(',')?;
            rest = rest.strip_prefix(char::is_whitespace).unwrap_or(rest);
        }
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if !(1..=3).contains(&digits) {
            return None;
        }
        *slot = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
    }

    match rest {
        "" => Some(out),
        tail if trailing && tail.len() > 1 && tail.starts_with(',') => Some(out),
        _ => None,
    }
}
