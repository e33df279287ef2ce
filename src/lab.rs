//! CIE L\*a\*b\* coordinates and the CMC l:c color difference.

use crate::Color;

/// A color in the CIE L\*a\*b\* color space with a D65 reference white
/// point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lab {
    /// The lightness in the range 0. to 100.
    pub l: f64,
    /// Green (negative) to red (positive) axis.
    pub a: f64,
    /// Blue (negative) to yellow (positive) axis.
    pub b: f64,
}

const EPS0: f64 = 6. / 29.;
const EPS: f64 = EPS0 * EPS0 * EPS0;
// D65 reference white.
const XN: f64 = 0.950470;
const YN: f64 = 1.;
const ZN: f64 = 1.088830;

/// sRGB transfer function, from a component in \[0, 255\] to linear
/// light in \[0, 1\].
fn linear(c: f64) -> f64 {
    let c = c / 255.;
    if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

impl Lab {
    pub fn from_color(c: &Color) -> Lab {
        const C0: f64 = 1. / 3.;
        const C1: f64 = 841. / 108.;
        const C2: f64 = 4. / 29.;
        let rgba = c.to_rgba();
        let (r, g, b) = (linear(rgba.r), linear(rgba.g), linear(rgba.b));
        let xr = (0.4124564 * r + 0.3575761 * g + 0.1804375 * b) / XN;
        let yr = (0.2126729 * r + 0.7151522 * g + 0.0721750 * b) / YN;
        let zr = (0.0193339 * r + 0.1191920 * g + 0.9503041 * b) / ZN;
        let fx = if xr > EPS { xr.powf(C0) } else { C1 * xr + C2 };
        let fy = if yr > EPS { yr.powf(C0) } else { C1 * yr + C2 };
        let fz = if zr > EPS { zr.powf(C0) } else { C1 * zr + C2 };
        Lab { l: (116. * fy - 16.).max(0.),
              a: 500. * (fx - fy),
              b: 200. * (fy - fz) }
    }

    /// The chroma C\*_ab.
    #[inline]
    pub fn chroma(&self) -> f64 { self.a.hypot(self.b) }

    /// The hue angle in degrees, in \[0, 360).  Achromatic colors have
    /// hue 0.
    pub fn hue(&self) -> f64 {
        if self.chroma() < 1e-6 { return 0. }
        self.b.atan2(self.a).to_degrees().rem_euclid(360.)
    }
}

/// A perceptual color difference metric.
///
/// Implementations need not be symmetric.  [`Difference::difference`]
/// symmetrizes the metric by averaging both argument orders.
pub trait Difference {
    /// Difference of `sample` with respect to `reference`.  Must be ≥ 0.
    fn delta_e(&self, reference: &Color, sample: &Color) -> f64;

    fn difference(&self, a: &Color, b: &Color) -> f64 {
        0.5 * (self.delta_e(a, b) + self.delta_e(b, a))
    }
}

/// The CMC l:c (1984) color difference with l = c = 1.
///
/// The tolerance ellipsoid is centered on the reference color, which
/// makes the metric asymmetric.
#[derive(Clone, Copy, Debug, Default)]
pub struct Cmc;

impl Difference for Cmc {
    fn delta_e(&self, reference: &Color, sample: &Color) -> f64 {
        let lab1 = Lab::from_color(reference);
        let lab2 = Lab::from_color(sample);
        let c1 = lab1.chroma();
        let c2 = lab2.chroma();
        let sl = if lab1.l < 16. { 0.511 }
                 else { 0.040975 * lab1.l / (1. + 0.01765 * lab1.l) };
        let sc = 0.0638 * c1 / (1. + 0.0131 * c1) + 0.638;
        let h1 = lab1.hue();
        let t = if (164. ..= 345.).contains(&h1) {
            0.56 + (0.2 * (h1 + 168.).to_radians().cos()).abs()
        } else {
            0.36 + (0.4 * (h1 + 35.).to_radians().cos()).abs()
        };
        let c4 = c1 * c1 * c1 * c1;
        let f = (c4 / (c4 + 1900.)).sqrt();
        let sh = sc * (f * t + 1. - f);
        let dl = lab1.l - lab2.l;
        let dc = c1 - c2;
        let da = lab1.a - lab2.a;
        let db = lab1.b - lab2.b;
        // ΔH² may come out slightly negative through rounding.
        let dh2 = (da * da + db * db - dc * dc).max(0.);
        let vl = dl / sl;
        let vc = dc / sc;
        (vl * vl + vc * vc + dh2 / (sh * sh)).sqrt()
    }
}
