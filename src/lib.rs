//! Check whether the colors of a palette remain distinguishable for
//! people with a color vision deficiency.
//!
//! - [`check_palette`] returns the [`Deficiency`]s under which two
//!   colors that are distinct with normal vision become confusable.
//! - [`simulate_color`] shows a color as perceived with a deficiency.
//!
//! Both accept colors as text (hex, `rgb()`, CSS names; see [`Color`]).
//! The [`Checker`] works on parsed colors and lets one swap the
//! simulation ([`Simulate`]) and the perceptual metric ([`Difference`]).
//!
//! The [`chat`] module holds the request/response contract of the
//! companion chat proxy.
//!
//! # Example
//!
//! ```
//! use color_blind_check::{check_palette, Deficiency};
//! let verdict = check_palette(["#000000", "#ffffff"]).unwrap();
//! assert!(verdict.is_safe());
//! let verdict = check_palette(["#f04000", "#00b020"]).unwrap();
//! assert!(verdict.contains(Deficiency::Protanopia));
//! ```

mod checker;
mod color;
mod deficiency;
mod error;
mod lab;
pub mod chat;

pub use checker::{Checker, PairReport, Verdict, JUST_NOTICEABLE_DIFFERENCE,
                  RATIO_THRESHOLD};
pub use color::Color;
pub use deficiency::{ConfusionLine, ConfusionPoint, Deficiency, Simulate};
pub use error::{ColorParseError, Error, Result};
pub use lab::{Cmc, Difference, Lab};

/// Parse `input` as a color, keeping the offending text in the error.
pub fn parse_color(input: &str) -> Result<Color> {
    input.parse::<Color>().map_err(|reason| Error::ParseColor {
        input: input.to_owned(), reason })
}

/// Return the deficiencies (in [`Deficiency::ALL`] order) for which the
/// palette `colors` is unsafe, i.e., for which at least one pair of
/// colors that is distinguishable with normal vision becomes
/// confusable.  Palettes with fewer than 2 colors are safe.
///
/// The first color that cannot be parsed is reported as an error.
pub fn check_palette<I>(colors: I) -> Result<Verdict>
where I: IntoIterator, I::Item: AsRef<str> {
    let colors = colors.into_iter()
        .map(|c| parse_color(c.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Checker::new().check(&colors))
}

/// Return, as canonical hex, `color` as perceived with the deficiency
/// named `deficiency` (`deuteranopia`, `protanopia` or `tritanopia`).
///
/// ```
/// use color_blind_check::simulate_color;
/// assert_eq!(simulate_color("red", "tritanopia").unwrap(), "#fd1800");
/// assert!(simulate_color("red", "monochromacy").is_err());
/// ```
pub fn simulate_color(color: &str, deficiency: &str) -> Result<String> {
    let deficiency: Deficiency = deficiency.parse()?;
    let color = parse_color(color)?;
    Ok(deficiency.simulate(color).hex())
}
