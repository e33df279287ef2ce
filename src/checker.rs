//! Pairwise distinguishability check of palettes.

use std::fmt;
use serde::Serialize;
use tracing::debug;

use crate::deficiency::{ConfusionLine, Deficiency, Simulate};
use crate::lab::{Cmc, Difference};
use crate::Color;

/// Smallest perceivable difference, on the CMC l:c scale.  Pairs closer
/// than this to normal vision are never reported.
pub const JUST_NOTICEABLE_DIFFERENCE: f64 = 9.;

/// A pair is problematic only if its difference shrinks by more than
/// this factor under the simulated deficiency.
pub const RATIO_THRESHOLD: f64 = 5.;

/// The outcome of comparing two colors of a palette for one deficiency.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PairReport {
    /// Positions of the two colors in the palette (`first < second`).
    pub first: usize,
    pub second: usize,
    /// Symmetric difference with normal vision.
    pub distance_norm: f64,
    /// Symmetric difference of the simulated colors, or `None` when the
    /// pair was skipped because `distance_norm` is below
    /// [`JUST_NOTICEABLE_DIFFERENCE`].
    pub distance_sim: Option<f64>,
}

impl PairReport {
    /// Whether two distinguishable colors become confusable: the
    /// difference drops by more than [`RATIO_THRESHOLD`] *and* below
    /// [`JUST_NOTICEABLE_DIFFERENCE`].
    pub fn is_problematic(&self) -> bool {
        match self.distance_sim {
            None => false,
            Some(sim) => self.distance_norm / sim > RATIO_THRESHOLD
                && sim < JUST_NOTICEABLE_DIFFERENCE,
        }
    }
}

/// The deficiencies for which a palette is unsafe, in
/// [`Deficiency::ALL`] order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Verdict {
    unsafe_for: Vec<Deficiency>,
}

impl Verdict {
    /// `true` if no deficiency makes two colors of the palette
    /// confusable.
    pub fn is_safe(&self) -> bool { self.unsafe_for.is_empty() }

    /// Says whether the palette is unsafe for `deficiency`.
    pub fn contains(&self, deficiency: Deficiency) -> bool {
        self.unsafe_for.contains(&deficiency)
    }

    pub fn iter(&self) -> impl Iterator<Item = Deficiency> + '_ {
        self.unsafe_for.iter().copied()
    }

    pub fn as_slice(&self) -> &[Deficiency] { &self.unsafe_for }
}

impl FromIterator<Deficiency> for Verdict {
    /// Collect deficiencies, sorted and without duplicates.
    fn from_iter<I: IntoIterator<Item = Deficiency>>(iter: I) -> Self {
        let mut unsafe_for: Vec<_> = iter.into_iter().collect();
        unsafe_for.sort();
        unsafe_for.dedup();
        Verdict { unsafe_for }
    }
}

impl<'a> IntoIterator for &'a Verdict {
    type Item = Deficiency;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Deficiency>>;

    fn into_iter(self) -> Self::IntoIter { self.unsafe_for.iter().copied() }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_safe() { return f.write_str("safe") }
        for (i, d) in self.iter().enumerate() {
            if i > 0 { f.write_str(", ")? }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Palette checker, parametrized by the deficiency simulation and the
/// perceptual difference metric.
///
/// # Example
///
/// ```
/// use color_blind_check::{Checker, Color, Deficiency};
/// let palette = [Color::new(0xf0, 0x40, 0), Color::new(0, 0xb0, 0x20)];
/// let verdict = Checker::new().check(&palette);
/// assert!(verdict.contains(Deficiency::Deuteranopia));
/// assert!(!verdict.contains(Deficiency::Tritanopia));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Checker<S = ConfusionLine, D = Cmc> {
    simulator: S,
    metric: D,
}

impl Checker {
    /// A checker using the [`ConfusionLine`] simulation and the [`Cmc`]
    /// metric.
    pub const fn new() -> Self {
        Checker { simulator: ConfusionLine, metric: Cmc }
    }
}

impl<S, D> Checker<S, D>
where S: Simulate, D: Difference {
    pub fn with(simulator: S, metric: D) -> Self {
        Checker { simulator, metric }
    }

    /// Symmetric perceptual difference of `a` and `b`.
    #[inline]
    pub fn distance(&self, a: &Color, b: &Color) -> f64 {
        self.metric.difference(a, b)
    }

    /// Compare `colors[i]` and `colors[j]` under `deficiency`.
    fn compare(&self, colors: &[Color], i: usize, j: usize,
               deficiency: Deficiency) -> PairReport {
        let (a, b) = (&colors[i], &colors[j]);
        let distance_norm = self.distance(a, b);
        let distance_sim = if distance_norm < JUST_NOTICEABLE_DIFFERENCE {
            None
        } else {
            let a = self.simulator.simulate(*a, deficiency);
            let b = self.simulator.simulate(*b, deficiency);
            Some(self.distance(&a, &b))
        };
        PairReport { first: i, second: j, distance_norm, distance_sim }
    }

    /// Return an iterator over the reports of all unordered pairs of
    /// `colors`, each pair being compared exactly once.
    pub fn pairs<'a>(&'a self, colors: &'a [Color], deficiency: Deficiency)
                     -> impl Iterator<Item = PairReport> + 'a {
        let k = colors.len();
        (0 .. k).flat_map(move |i| (i + 1 .. k).map(move |j| (i, j)))
            .map(move |(i, j)| self.compare(colors, i, j, deficiency))
    }

    /// Number of pairs of `colors` that become confusable under
    /// `deficiency`.
    pub fn problematic_pairs(&self, colors: &[Color],
                             deficiency: Deficiency) -> usize {
        self.pairs(colors, deficiency).filter(PairReport::is_problematic)
            .count()
    }

    /// Says whether all pairs of `colors` that are distinguishable with
    /// normal vision remain so under `deficiency`.  Palettes with fewer
    /// than 2 colors are safe.
    pub fn is_safe(&self, colors: &[Color], deficiency: Deficiency) -> bool {
        let problematic = self.problematic_pairs(colors, deficiency);
        debug!(%deficiency, colors = colors.len(), problematic,
               "checked palette");
        problematic == 0
    }

    /// Return the deficiencies for which `colors` is unsafe.
    ///
    /// For `k` colors this performs, per deficiency, at most k(k-1)/2
    /// pair comparisons, each costing 2 metric evaluations plus, for
    /// pairs that are distinguishable with normal vision, 2 simulations
    /// and 2 more metric evaluations.
    pub fn check(&self, colors: &[Color]) -> Verdict {
        Deficiency::ALL.into_iter()
            .filter(|&d| !self.is_safe(colors, d))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Every color looks black.
    struct Blackout;

    impl Simulate for Blackout {
        fn simulate(&self, _: Color, _: Deficiency) -> Color {
            Color::new(0, 0, 0)
        }
    }

    #[test]
    fn report_thresholds() {
        let report = |norm: f64, sim: Option<f64>| PairReport {
            first: 0, second: 1, distance_norm: norm, distance_sim: sim };
        assert!(!report(50., None).is_problematic());
        assert!(report(50., Some(8.9)).is_problematic());
        assert!(report(50., Some(0.)).is_problematic());
        // Ratio exactly at the threshold is not enough.
        assert!(!report(40., Some(8.)).is_problematic());
        // Large ratio but still noticeable.
        assert!(!report(100., Some(9.)).is_problematic());
    }

    #[test]
    fn collapsed_palette() {
        let checker = Checker::with(Blackout, Cmc);
        let palette = [Color::new(255, 0, 0), Color::new(0, 0, 255)];
        let verdict = checker.check(&palette);
        assert_eq!(verdict.as_slice(), &Deficiency::ALL);
        assert_eq!(verdict.to_string(), "deuteranopia, protanopia, tritanopia");
        // Near identical colors are skipped before simulation.
        let close = [Color::new(255, 0, 0), Color::new(254, 1, 1)];
        assert!(checker.check(&close).is_safe());
        assert_eq!(checker.pairs(&close, Deficiency::Protanopia)
                   .next().unwrap().distance_sim, None);
    }

    #[test]
    fn pair_enumeration() {
        let palette: Vec<_> = (0 .. 5u8).map(|i| Color::new(50 * i, 0, 0))
            .collect();
        let checker = Checker::new();
        let pairs: Vec<_> = checker.pairs(&palette, Deficiency::Tritanopia)
            .map(|p| (p.first, p.second)).collect();
        assert_eq!(pairs, [(0, 1), (0, 2), (0, 3), (0, 4), (1, 2), (1, 3),
                           (1, 4), (2, 3), (2, 4), (3, 4)]);
        assert_eq!(checker.pairs(&palette[.. 1], Deficiency::Tritanopia)
                   .count(), 0);
    }

    #[test]
    fn verdict_collects_in_order() {
        let v: Verdict = [Deficiency::Tritanopia, Deficiency::Deuteranopia,
                          Deficiency::Tritanopia].into_iter().collect();
        assert_eq!(v.as_slice(),
                   &[Deficiency::Deuteranopia, Deficiency::Tritanopia]);
        assert_eq!(Verdict::default().to_string(), "safe");
        assert_eq!(serde_json::to_string(&v).unwrap(),
                   r#"["deuteranopia","tritanopia"]"#);
    }
}
