//! Alignment distance newtype wrapper.

use std::fmt;

use crate::error::DtwError;

/// A non-negative cumulative alignment distance.
///
/// The sum of local frame distances along a warping path.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct DtwDistance(f64);

impl DtwDistance {
    /// Zero distance: a perfect alignment, or the placeholder for a missing session.
    pub const ZERO: Self = Self(0.0);

    /// Create a distance from a raw value, e.g. one read back from storage.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::InvalidDistance`] | `value` is negative, NaN, or infinite |
    pub fn new(value: f64) -> Result<Self, DtwError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DtwError::InvalidDistance { value });
        }
        Ok(Self(value))
    }

    /// Wrap a value produced by the DP. Sums of non-negative local distances.
    pub(crate) fn new_unchecked(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for DtwDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let d = DtwDistance::new(1.234567).unwrap();
        assert_eq!(format!("{d}"), "1.234567");
    }

    #[test]
    fn rejects_negative_and_non_finite() {
        assert!(matches!(
            DtwDistance::new(-0.5),
            Err(DtwError::InvalidDistance { .. })
        ));
        assert!(DtwDistance::new(f64::NAN).is_err());
        assert!(DtwDistance::new(f64::INFINITY).is_err());
    }

    #[test]
    fn zero_constant() {
        assert_eq!(DtwDistance::ZERO.value(), 0.0);
        assert_eq!(DtwDistance::new(0.0).unwrap(), DtwDistance::ZERO);
    }
}
