use thiserror::Error;

/// Reasons a textual color can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("invalid hex length")]
    InvalidLength,
    #[error("invalid hex digits")]
    InvalidHex,
    #[error("invalid rgb()/rgba() function")]
    InvalidFunction,
    #[error("component out of range")]
    OutOfRange,
    #[error("unknown color name")]
    UnknownName,
}

/// Errors reported by [`check_palette`](crate::check_palette) and
/// [`simulate_color`](crate::simulate_color).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The input could not be read as a color.
    #[error("cannot parse color “{input}”: {reason}")]
    ParseColor {
        input: String,
        #[source]
        reason: ColorParseError,
    },

    /// The deficiency name is not one of `deuteranopia`, `protanopia`
    /// or `tritanopia`.
    #[error("unknown color vision deficiency “{0}” \
             (expected deuteranopia, protanopia or tritanopia)")]
    UnknownDeficiency(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
