//! Feature sequence types with validation guarantees.

use std::ops::Index;
use std::slice::ChunksExact;

use crate::error::DtwError;
use crate::timing::FrameTiming;

/// Check that `data` holds a whole, non-empty number of finite `width`-wide frames.
fn validate_flat(data: &[f64], width: usize) -> Result<(), DtwError> {
    if width == 0 {
        return Err(DtwError::ZeroWidthFrame);
    }
    if data.is_empty() {
        return Err(DtwError::EmptySequence);
    }
    let remainder = data.len() % width;
    if remainder != 0 {
        return Err(DtwError::RaggedFrames {
            frame: data.len() / width,
            expected: width,
            got: remainder,
        });
    }
    if let Some(index) = data.iter().position(|v| !v.is_finite()) {
        return Err(DtwError::NonFiniteValue {
            frame: index / width,
            coefficient: index % width,
        });
    }
    Ok(())
}

/// Owned, validated sequence of feature frames.
///
/// Frames are stored row-major in a single buffer: frame `i` occupies
/// `data[i * width..(i + 1) * width]`. Guaranteed non-empty, with a non-zero
/// common width and all values finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSequence {
    data: Vec<f64>,
    width: usize,
    timing: FrameTiming,
}

impl FeatureSequence {
    /// Create a feature sequence from per-frame coefficient vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::EmptySequence`] | `frames` is empty |
    /// | [`DtwError::ZeroWidthFrame`] | The first frame has no coefficients |
    /// | [`DtwError::RaggedFrames`] | A frame's width differs from the first frame's |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(frames: Vec<Vec<f64>>, timing: FrameTiming) -> Result<Self, DtwError> {
        let width = frames.first().ok_or(DtwError::EmptySequence)?.len();
        if width == 0 {
            return Err(DtwError::ZeroWidthFrame);
        }
        let mut data = Vec::with_capacity(frames.len() * width);
        for (frame, values) in frames.into_iter().enumerate() {
            if values.len() != width {
                return Err(DtwError::RaggedFrames {
                    frame,
                    expected: width,
                    got: values.len(),
                });
            }
            data.extend(values);
        }
        Self::from_flat(data, width, timing)
    }

    /// Create a feature sequence from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FeatureSequence::new`]; a buffer whose length is not
    /// a multiple of `width` reports [`DtwError::RaggedFrames`] for the trailing frame.
    pub fn from_flat(data: Vec<f64>, width: usize, timing: FrameTiming) -> Result<Self, DtwError> {
        validate_flat(&data, width)?;
        Ok(Self {
            data,
            width,
            timing,
        })
    }

    /// Borrow this sequence as a zero-copy view.
    #[must_use]
    pub fn as_view(&self) -> FeatureView<'_> {
        FeatureView::new_unchecked(&self.data, self.width)
    }

    /// Return the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / self.width
    }

    /// Return true if the sequence has no frames.
    ///
    /// Always `false` for sequences built through the validating constructors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the number of coefficients per frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return the frame timing.
    #[must_use]
    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// Return frame `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn frame(&self, i: usize) -> &[f64] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    /// Iterate over frames in order.
    pub fn frames(&self) -> ChunksExact<'_, f64> {
        self.data.chunks_exact(self.width)
    }

    /// Return the duration covered by the frame steps, in seconds.
    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.timing.frames_to_seconds(self.len() as i64)
    }
}

/// Borrowed, validated view of feature frames. Zero-copy reference.
#[derive(Debug, Clone, Copy)]
pub struct FeatureView<'a> {
    data: &'a [f64],
    width: usize,
}

impl<'a> FeatureView<'a> {
    /// Create a view over a flat row-major buffer, validating it.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`DtwError::ZeroWidthFrame`] | `width` is zero |
    /// | [`DtwError::EmptySequence`] | `data` is empty |
    /// | [`DtwError::RaggedFrames`] | `data.len()` is not a multiple of `width` |
    /// | [`DtwError::NonFiniteValue`] | Any value is NaN or infinite |
    pub fn new(data: &'a [f64], width: usize) -> Result<Self, DtwError> {
        validate_flat(data, width)?;
        Ok(Self { data, width })
    }

    /// Create a view without validation. For internal use where data is already validated.
    pub(crate) fn new_unchecked(data: &'a [f64], width: usize) -> Self {
        Self { data, width }
    }

    /// Return the underlying row-major buffer.
    #[must_use]
    pub fn as_flat(&self) -> &'a [f64] {
        self.data
    }

    /// Return the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.width == 0 {
            0
        } else {
            self.data.len() / self.width
        }
    }

    /// Return true if the view has no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Return the number of coefficients per frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Return frame `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.len()`.
    #[must_use]
    pub fn frame(&self, i: usize) -> &'a [f64] {
        &self.data[i * self.width..(i + 1) * self.width]
    }

    /// Iterate over frames in order.
    pub fn frames(&self) -> ChunksExact<'a, f64> {
        self.data.chunks_exact(self.width)
    }
}

impl Index<usize> for FeatureView<'_> {
    type Output = [f64];

    fn index(&self, index: usize) -> &Self::Output {
        self.frame(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> FrameTiming {
        FrameTiming::new(110, 22050).unwrap()
    }

    #[test]
    fn rejects_empty_frames() {
        let result = FeatureSequence::new(vec![], timing());
        assert!(matches!(result, Err(DtwError::EmptySequence)));
    }

    #[test]
    fn rejects_zero_width() {
        let result = FeatureSequence::new(vec![vec![], vec![]], timing());
        assert!(matches!(result, Err(DtwError::ZeroWidthFrame)));
    }

    #[test]
    fn rejects_ragged_frames() {
        let result = FeatureSequence::new(vec![vec![1.0, 2.0], vec![3.0]], timing());
        assert!(matches!(
            result,
            Err(DtwError::RaggedFrames {
                frame: 1,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn rejects_nan_with_position() {
        let result = FeatureSequence::new(
            vec![vec![1.0, 2.0], vec![3.0, f64::NAN]],
            timing(),
        );
        assert!(matches!(
            result,
            Err(DtwError::NonFiniteValue {
                frame: 1,
                coefficient: 1
            })
        ));
    }

    #[test]
    fn rejects_flat_remainder() {
        let result = FeatureSequence::from_flat(vec![1.0, 2.0, 3.0], 2, timing());
        assert!(matches!(
            result,
            Err(DtwError::RaggedFrames {
                frame: 1,
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn accepts_valid_sequence() {
        let seq = FeatureSequence::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
            timing(),
        )
        .unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.width(), 2);
        assert_eq!(seq.frame(1), &[3.0, 4.0]);
        assert_eq!(seq.frames().count(), 3);
    }

    #[test]
    fn view_rejects_infinity() {
        let data = [1.0, f64::INFINITY];
        let result = FeatureView::new(&data, 1);
        assert!(matches!(
            result,
            Err(DtwError::NonFiniteValue {
                frame: 1,
                coefficient: 0
            })
        ));
    }

    #[test]
    fn view_indexing() {
        let data = [10.0, 11.0, 20.0, 21.0];
        let view = FeatureView::new(&data, 2).unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(&view[0], &[10.0, 11.0]);
        assert_eq!(&view[1], &[20.0, 21.0]);
    }

    #[test]
    fn as_view_shares_buffer() {
        let seq = FeatureSequence::new(vec![vec![1.0], vec![2.0]], timing()).unwrap();
        let view = seq.as_view();
        assert_eq!(view.as_flat(), &[1.0, 2.0]);
        assert_eq!(view.width(), 1);
    }

    #[test]
    fn duration_uses_timing() {
        let seq = FeatureSequence::from_flat(vec![0.0; 2205], 1, timing()).unwrap();
        assert!((seq.duration_seconds() - 11.0).abs() < 1e-12);
    }
}
