//! sRGB colors, their textual forms and canonical hex rendering.

use std::fmt;
use std::str::FromStr;
use rgb::{RGB8, RGBA, RGBA8};

use crate::error::ColorParseError;
use crate::lab::{Cmc, Difference};

mod names;

/// An sRGB color with 8 bits per channel and an alpha component.
///
/// The channels are exactly what the canonical hex form encodes, so a
/// `Color` always survives a round trip through [`Color::hex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(RGBA8);

impl Color {
    /// An opaque color from its red, green and blue components.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color(RGBA8 { r, g, b, a: 255 })
    }

    /// A color with an explicit alpha component (255 is opaque).
    #[inline]
    pub const fn with_alpha(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color(RGBA8 { r, g, b, a })
    }

    /// The red, green and blue components.
    #[inline]
    pub fn rgb(&self) -> RGB8 { RGB8 { r: self.0.r, g: self.0.g, b: self.0.b } }

    #[inline]
    pub fn alpha(&self) -> u8 { self.0.a }

    /// Canonical lowercase hex: `#rrggbb`, or `#rrggbbaa` when the
    /// color is not fully opaque.
    ///
    /// ```
    /// use color_blind_check::Color;
    /// let c: Color = "Red".parse().unwrap();
    /// assert_eq!(c.hex(), "#ff0000");
    /// ```
    pub fn hex(&self) -> String {
        let RGBA { r, g, b, a } = self.0;
        if a == 255 { format!("#{r:02x}{g:02x}{b:02x}") }
        else { format!("#{r:02x}{g:02x}{b:02x}{a:02x}") }
    }

    /// CMC l:c color difference from `self` to `other`.  The metric
    /// weights by the lightness, chroma and hue of `self`, hence
    /// `a.delta_e(&b)` and `b.delta_e(&a)` generally differ.
    #[inline]
    pub fn delta_e(&self, other: &Color) -> f64 { Cmc.delta_e(self, other) }

    /// Symmetric perceptual difference: the mean of
    /// [`delta_e`](Color::delta_e) taken in both directions.
    pub fn difference(&self, other: &Color) -> f64 {
        Cmc.difference(self, other)
    }

    /// Components as floats in \[0, 255\] (alpha included).
    #[inline]
    pub(crate) fn to_rgba(&self) -> RGBA<f64> {
        let RGBA { r, g, b, a } = self.0;
        RGBA { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }
    }
}

impl From<RGB8> for Color {
    #[inline]
    fn from(c: RGB8) -> Self { Color::new(c.r, c.g, c.b) }
}

impl From<RGBA8> for Color {
    #[inline]
    fn from(c: RGBA8) -> Self { Color(c) }
}

impl From<Color> for RGBA8 {
    #[inline]
    fn from(c: Color) -> Self { c.0 }
}

impl From<Color> for RGB8 {
    #[inline]
    fn from(c: Color) -> Self { c.rgb() }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepted forms: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` (the `#`
    /// may be omitted for the 6 and 8 digit forms), `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` with `a` ∈ \[0, 1\], and CSS color names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() { return Err(ColorParseError::Empty) }
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex)
        }
        let lower = s.to_ascii_lowercase();
        if let Some(&[r, g, b]) = names::NAMES.get(lower.as_str()) {
            return Ok(Color::new(r, g, b))
        }
        if let Some(args) = function_args(&lower, "rgba") {
            return parse_rgba(args)
        }
        if let Some(args) = function_args(&lower, "rgb") {
            return parse_rgb(args)
        }
        if matches!(s.len(), 6 | 8) && s.bytes().all(|c| c.is_ascii_hexdigit()) {
            return parse_hex(s)
        }
        Err(ColorParseError::UnknownName)
    }
}

/// Return the text between the parentheses of `name(...)`.
fn function_args<'a>(s: &'a str, name: &str) -> Option<&'a str> {
    s.strip_prefix(name)?.trim_start().strip_prefix('(')?.strip_suffix(')')
}

fn nibble(c: u8) -> Result<u8, ColorParseError> {
    match c {
        b'0' ..= b'9' => Ok(c - b'0'),
        b'a' ..= b'f' => Ok(c - b'a' + 10),
        b'A' ..= b'F' => Ok(c - b'A' + 10),
        _ => Err(ColorParseError::InvalidHex),
    }
}

fn parse_hex(hex: &str) -> Result<Color, ColorParseError> {
    let d = hex.as_bytes();
    let short = |i: usize| nibble(d[i]).map(|x| x * 17);
    let long = |i: usize| -> Result<u8, ColorParseError> {
        Ok(nibble(d[i])? << 4 | nibble(d[i + 1])?)
    };
    match d.len() {
        3 => Ok(Color::new(short(0)?, short(1)?, short(2)?)),
        4 => Ok(Color::with_alpha(short(0)?, short(1)?, short(2)?, short(3)?)),
        6 => Ok(Color::new(long(0)?, long(2)?, long(4)?)),
        8 => Ok(Color::with_alpha(long(0)?, long(2)?, long(4)?, long(6)?)),
        _ => Err(ColorParseError::InvalidLength),
    }
}

fn channel(s: &str) -> Result<u8, ColorParseError> {
    let v: u16 = s.trim().parse()
        .map_err(|_| ColorParseError::InvalidFunction)?;
    u8::try_from(v).map_err(|_| ColorParseError::OutOfRange)
}

fn parse_rgb(args: &str) -> Result<Color, ColorParseError> {
    let c: Vec<&str> = args.split(',').collect();
    let &[r, g, b] = c.as_slice() else { return Err(ColorParseError::InvalidFunction) };
    Ok(Color::new(channel(r)?, channel(g)?, channel(b)?))
}

fn parse_rgba(args: &str) -> Result<Color, ColorParseError> {
    let c: Vec<&str> = args.split(',').collect();
    let &[r, g, b, a] = c.as_slice() else { return Err(ColorParseError::InvalidFunction) };
    let a: f64 = a.trim().parse()
        .map_err(|_| ColorParseError::InvalidFunction)?;
    if !(0. ..= 1.).contains(&a) { return Err(ColorParseError::OutOfRange) }
    let a = (255. * a).round() as u8;
    Ok(Color::with_alpha(channel(r)?, channel(g)?, channel(b)?, a))
}
