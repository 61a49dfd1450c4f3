//! Translates a wellbeing-index delta (a z-score shift) into an approximate
//! percentile position under the standard normal distribution.
//!
//! The index is standardized, so a respondent at the control mean sits at the
//! 50th percentile. A group whose mean rises by delta moves to roughly the
//! `100 * CDF(delta)` percentile. This is a presentation device, not an
//! inference: no standard errors accompany it.

use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// Percentile of the starting position, by construction of the z-index.
pub const BASELINE_PERCENTILE: i64 = 50;

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are valid")
}

/// Percentile position implied by a z-score, rounded to the nearest integer.
pub fn percentile_of(z: f64) -> i64 {
    (standard_normal().cdf(z) * 100.0).round() as i64
}

/// The percentile movement implied by a mean delta.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PercentileShift {
    pub from: i64,
    pub to: i64,
}

impl PercentileShift {
    pub fn from_delta(delta: f64) -> Self {
        PercentileShift {
            from: BASELINE_PERCENTILE,
            to: percentile_of(delta),
        }
    }

    /// A delta whose target percentile rounds back onto the starting point
    /// is not worth a single-point claim.
    pub fn is_meaningful(&self) -> bool {
        self.from != self.to
    }
}

impl fmt::Display for PercentileShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_meaningful() {
            write!(
                f,
                "≈ {} → {} percentile",
                ordinal(self.from),
                ordinal(self.to)
            )
        } else {
            f.write_str("no meaningful shift")
        }
    }
}

/// Renders `60` as `60th`, `61` as `61st`, and so on.
fn ordinal(n: i64) -> String {
    let suffix = match n % 100 {
        11..=13 => "th",
        _ => match n % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    };
    format!("{n}{suffix}")
}
