//! Color vision deficiencies and their simulation.
//!
//! Dichromacy is simulated with the confusion line model: the color is
//! projected, in CIE xy chromaticity at constant luminance, along the
//! line through the deficiency's copunctal point onto the axis of colors
//! the dichromat still perceives.  See
//! https://www.color-blindness.com/coblis-color-blindness-simulator/

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::{Color, Error};

/// A supported color vision deficiency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Deficiency {
    /// Absence of green (M) cones; red-green confusion.
    Deuteranopia,
    /// Absence of red (L) cones; red-green confusion with darkened reds.
    Protanopia,
    /// Absence of blue (S) cones; blue-yellow confusion.
    Tritanopia,
}

impl Deficiency {
    /// All deficiencies, in the order verdicts are reported.
    pub const ALL: [Deficiency; 3] =
        [Deficiency::Deuteranopia, Deficiency::Protanopia,
         Deficiency::Tritanopia];

    /// The lowercase name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Deficiency::Deuteranopia => "deuteranopia",
            Deficiency::Protanopia => "protanopia",
            Deficiency::Tritanopia => "tritanopia",
        }
    }

    /// The confusion line parameters of this deficiency.
    pub fn confusion_point(self) -> &'static ConfusionPoint {
        match self {
            Deficiency::Deuteranopia => &DEUTAN,
            Deficiency::Protanopia => &PROTAN,
            Deficiency::Tritanopia => &TRITAN,
        }
    }

    /// Return `color` as perceived with this deficiency, using the
    /// default [`ConfusionLine`] model.
    ///
    /// ```
    /// use color_blind_check::{Color, Deficiency};
    /// let red = Color::new(255, 0, 0);
    /// assert_eq!(Deficiency::Deuteranopia.simulate(red).hex(), "#a27a00");
    /// ```
    #[inline]
    pub fn simulate(self, color: Color) -> Color {
        ConfusionLine.simulate(color, self)
    }
}

impl fmt::Display for Deficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Deficiency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Deficiency::ALL.into_iter().find(|d| d.name() == s)
            .ok_or_else(|| Error::UnknownDeficiency(s.to_owned()))
    }
}

/// Confusion line parameters of a dichromacy, in CIE xy chromaticity
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfusionPoint {
    /// Copunctal point, where all confusion lines meet.
    pub x: f64,
    pub y: f64,
    /// Slope and y-intercept of the axis of perceived colors.
    pub slope: f64,
    pub intercept: f64,
}

const PROTAN: ConfusionPoint =
    ConfusionPoint { x: 0.735, y: 0.265, slope: 1.273463, intercept: -0.073894 };
const DEUTAN: ConfusionPoint =
    ConfusionPoint { x: 1.14, y: -0.14, slope: 0.968437, intercept: 0.003331 };
const TRITAN: ConfusionPoint =
    ConfusionPoint { x: 0.171, y: -0.003, slope: 0.062921, intercept: 0.292119 };

/// A strategy to simulate color vision deficiencies.
pub trait Simulate {
    /// Return `color` as seen by an observer with `deficiency`.  The
    /// alpha component is kept.
    fn simulate(&self, color: Color, deficiency: Deficiency) -> Color;
}

/// The confusion line model of dichromacy (gamma 2.2 RGB, D65 white).
#[derive(Clone, Copy, Debug, Default)]
pub struct ConfusionLine;

const GAMMA: f64 = 2.2;
// D65 white point chromaticity.
const WX: f64 = 0.312713;
const WY: f64 = 0.329016;
const WZ: f64 = 0.358271;

#[derive(Clone, Copy)]
struct Xyz { x: f64, y: f64, z: f64 }

#[derive(Clone, Copy)]
struct LinearRgb { r: f64, g: f64, b: f64 }

impl Xyz {
    fn from_rgb(c: LinearRgb) -> Xyz {
        Xyz { x: 0.430574 * c.r + 0.341550 * c.g + 0.178325 * c.b,
              y: 0.222015 * c.r + 0.706655 * c.g + 0.071330 * c.b,
              z: 0.020183 * c.r + 0.129553 * c.g + 0.939180 * c.b }
    }

    fn to_rgb(self) -> LinearRgb {
        LinearRgb { r: 3.063218 * self.x - 1.393325 * self.y - 0.475802 * self.z,
                    g: -0.969243 * self.x + 1.875966 * self.y + 0.041555 * self.z,
                    b: 0.067871 * self.x - 0.228834 * self.y + 1.069251 * self.z }
    }
}

/// Share of the neutral shift `d` needed to bring component `s` back to
/// the nearest edge of \[0, 1\], or 0 when no share in \[0, 1\] does.
fn adjustment(s: f64, d: f64) -> f64 {
    if d == 0. { return 0. }
    let adj = ((if s < 0. { 0. } else { 1. }) - s) / d;
    if (0. ..= 1.).contains(&adj) { adj } else { 0. }
}

/// Back to an 8-bit gamma encoded component.  NaN maps to 0.
fn encode(v: f64) -> u8 {
    let v = if v >= 1. { 1. } else if v > 0. { v.powf(1. / GAMMA) } else { 0. };
    (255. * v).round() as u8
}

impl Simulate for ConfusionLine {
    fn simulate(&self, color: Color, deficiency: Deficiency) -> Color {
        let cp = deficiency.confusion_point();
        let rgba = color.to_rgba();
        let rgb = LinearRgb { r: (rgba.r / 255.).powf(GAMMA),
                              g: (rgba.g / 255.).powf(GAMMA),
                              b: (rgba.b / 255.).powf(GAMMA) };
        let xyz = Xyz::from_rgb(rgb);
        let sum = xyz.x + xyz.y + xyz.z;
        let (u, v) = if sum != 0. { (xyz.x / sum, xyz.y / sum) } else { (0., 0.) };

        // Confusion line through the color and the copunctal point, and
        // its intersection with the deficiency axis.
        let slope = if u < cp.x { (cp.y - v) / (cp.x - u) }
                    else { (v - cp.y) / (u - cp.x) };
        let intercept = v - u * slope;
        let du = (cp.intercept - intercept) / (slope - cp.slope);
        let dv = slope * du + intercept;

        let sim = Xyz { x: du * xyz.y / dv, y: xyz.y,
                        z: (1. - (du + dv)) * xyz.y / dv };
        let mut s = sim.to_rgb();
        // Shift towards neutral gray of the same luminance to get back
        // inside the RGB gamut.
        let neutral = Xyz { x: WX * xyz.y / WY - sim.x, y: 0.,
                            z: WZ * xyz.y / WY - sim.z };
        let d = neutral.to_rgb();
        let adjust = adjustment(s.r, d.r)
            .max(adjustment(s.g, d.g))
            .max(adjustment(s.b, d.b));
        s.r += adjust * d.r;
        s.g += adjust * d.g;
        s.b += adjust * d.b;

        Color::with_alpha(encode(s.r), encode(s.g), encode(s.b), color.alpha())
    }
}
