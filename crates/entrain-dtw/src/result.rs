//! Alignment result and the aligner seam shared by exact and approximate DTW.

use crate::distance::DtwDistance;
use crate::error::DtwError;
use crate::path::WarpingPath;
use crate::series::FeatureView;

/// Result of aligning two feature sequences.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentResult {
    /// Sum of local distances along `path`.
    pub distance: DtwDistance,
    /// Monotonic correspondence from `(0, 0)` to `(len_a - 1, len_b - 1)`.
    pub path: WarpingPath,
}

/// Computes an alignment between two feature sequences.
///
/// Implemented by [`ExactDtw`](crate::ExactDtw) and [`FastDtw`](crate::FastDtw).
pub trait Aligner {
    /// Align participant frames `a` against model frames `b`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | Either view has no frames |
    /// | [`DtwError::DimensionMismatch`] | Frame widths differ |
    fn align(&self, a: FeatureView<'_>, b: FeatureView<'_>) -> Result<AlignmentResult, DtwError>;
}

/// Validate a pair of views before alignment.
pub(crate) fn check_inputs(a: FeatureView<'_>, b: FeatureView<'_>) -> Result<(), DtwError> {
    if a.is_empty() || b.is_empty() {
        return Err(DtwError::EmptySequence);
    }
    if a.width() != b.width() {
        return Err(DtwError::DimensionMismatch {
            participant: a.width(),
            model: b.width(),
        });
    }
    Ok(())
}
