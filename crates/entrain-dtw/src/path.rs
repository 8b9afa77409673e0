//! Warping path types for DTW alignment.

use crate::error::DtwError;

/// A single step in a warping path, mapping frame `a` of the first (participant)
/// sequence to frame `b` of the second (model) sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WarpingStep {
    /// Frame index in the first sequence.
    pub a: usize,
    /// Frame index in the second sequence.
    pub b: usize,
}

impl WarpingStep {
    /// Create a new step.
    #[must_use]
    pub fn new(a: usize, b: usize) -> Self {
        Self { a, b }
    }

    /// Return `b - a` as a signed frame offset.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.b as i64 - self.a as i64
    }
}

/// An ordered sequence of warping steps from `(0, 0)` to `(n-1, m-1)`.
///
/// Each step advances at least one coordinate and never moves either
/// coordinate backwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarpingPath(Vec<WarpingStep>);

impl WarpingPath {
    /// Create a path from steps produced by the DP traceback.
    pub(crate) fn new(steps: Vec<WarpingStep>) -> Self {
        debug_assert!(Self::check_steps(&steps).is_ok());
        Self(steps)
    }

    /// Create a path from externally supplied steps (e.g. read back from storage).
    ///
    /// An empty step list is accepted so that consumers can report it in their
    /// own terms.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::PathOffOrigin`] | The first step is not `(0, 0)` |
    /// | [`DtwError::NonMonotonicPath`] | A step moves backwards or does not advance |
    pub fn from_steps(steps: Vec<WarpingStep>) -> Result<Self, DtwError> {
        Self::check_steps(&steps)?;
        Ok(Self(steps))
    }

    fn check_steps(steps: &[WarpingStep]) -> Result<(), DtwError> {
        if let Some(first) = steps.first()
            && (first.a != 0 || first.b != 0)
        {
            return Err(DtwError::PathOffOrigin {
                a: first.a,
                b: first.b,
            });
        }
        for (index, pair) in steps.windows(2).enumerate() {
            let (prev, next) = (pair[0], pair[1]);
            let advances = next.a > prev.a || next.b > prev.b;
            if next.a < prev.a || next.b < prev.b || !advances {
                return Err(DtwError::NonMonotonicPath { index: index + 1 });
            }
        }
        Ok(())
    }

    /// Return the warping steps as a slice.
    #[must_use]
    pub fn steps(&self) -> &[WarpingStep] {
        &self.0
    }

    /// Return the number of steps in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the path contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the final step, if any.
    #[must_use]
    pub fn end(&self) -> Option<WarpingStep> {
        self.0.last().copied()
    }

    /// Return true if the path ends at `(len_a - 1, len_b - 1)`.
    #[must_use]
    pub fn spans(&self, len_a: usize, len_b: usize) -> bool {
        len_a > 0
            && len_b > 0
            && self.end() == Some(WarpingStep::new(len_a - 1, len_b - 1))
    }
}

impl<'a> IntoIterator for &'a WarpingPath {
    type Item = &'a WarpingStep;
    type IntoIter = std::slice::Iter<'a, WarpingStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
