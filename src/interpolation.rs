//! Interpolation
//!
//! Policies used to resolve a quantile whose target position falls between
//! two observed values.
use crate::errors::QuantileForestError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Interpolated along the normalized cumulative weights.
    #[default]
    Linear,
    /// The lower bracket value.
    Lower,
    /// The upper bracket value.
    Higher,
    /// Average of the two bracket values.
    Midpoint,
    /// Bracket value closest to the linear estimate, ties go to the upper one.
    Nearest,
}

impl Interpolation {
    /// Resolve an estimate from its bracket.
    ///
    /// * `lower` - Value at the lower bracket.
    /// * `higher` - Value at the upper bracket, equal to `lower` when the
    ///   brackets coincide.
    /// * `linear` - Estimate interpolated along the normalized cumulative
    ///   weights. Returned by `Linear`, and used by `Nearest` to pick a side.
    /// * `eps` - Tolerance around the halfway point, ties go to `higher`.
    #[inline]
    pub fn resolve(&self, lower: f64, higher: f64, linear: f64, eps: f64) -> f64 {
        match self {
            Interpolation::Linear => linear,
            Interpolation::Lower => lower,
            Interpolation::Higher => higher,
            Interpolation::Midpoint => (lower + higher) / 2.0,
            Interpolation::Nearest => {
                let gap = higher - lower;
                if gap > 0.0 && linear - lower < gap * (0.5 - eps) {
                    lower
                } else {
                    higher
                }
            }
        }
    }
}

impl FromStr for Interpolation {
    type Err = QuantileForestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Interpolation::Linear),
            "lower" => Ok(Interpolation::Lower),
            "higher" => Ok(Interpolation::Higher),
            "midpoint" => Ok(Interpolation::Midpoint),
            "nearest" => Ok(Interpolation::Nearest),
            _ => Err(QuantileForestError::ParseString(
                s.to_string(),
                "Interpolation".to_string(),
                items_to_strings(vec!["linear", "lower", "higher", "midpoint", "nearest"]),
            )),
        }
    }
}

impl Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Interpolation::Linear => "linear",
            Interpolation::Lower => "lower",
            Interpolation::Higher => "higher",
            Interpolation::Midpoint => "midpoint",
            Interpolation::Nearest => "nearest",
        };
        write!(f, "{}", s)
    }
}
