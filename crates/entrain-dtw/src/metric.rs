//! Local (frame-to-frame) distance functions.

use std::fmt;
use std::str::FromStr;

/// Distance between two feature frames of equal width.
///
/// Implementations must return a finite, non-negative value for finite input.
/// Alignment is symmetric under swapping its inputs only when the local
/// distance is.
pub trait LocalDistance {
    /// Return the distance between frames `a` and `b`.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;
}

impl<F> LocalDistance for F
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        self(a, b)
    }
}

/// Euclidean (L2) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl LocalDistance for Euclidean {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

/// Manhattan (L1, city-block) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl LocalDistance for Manhattan {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }
}

/// Runtime-selectable local distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Metric {
    /// [`Euclidean`] distance.
    #[default]
    Euclidean,
    /// [`Manhattan`] distance.
    Manhattan,
}

impl LocalDistance for Metric {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean => Euclidean.distance(a, b),
            Self::Manhattan => Manhattan.distance(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Euclidean => f.write_str("euclidean"),
            Self::Manhattan => f.write_str("manhattan"),
        }
    }
}

/// Error returned when parsing an unknown metric name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric \"{0}\" (expected euclidean or manhattan)")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "euclidean" => Ok(Self::Euclidean),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}
